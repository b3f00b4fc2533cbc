//! Module: paginate
//! Responsibility: keyset (cursor) pagination over a compound sort key.
//! Does not own: cursor token encoding (see `cursor`) or predicate synthesis.
//! Boundary: continuation is expressed as a predicate and evaluated by the
//! store; no offsets are used.

use crate::{
    cursor::Cursor,
    direction::Direction,
    document::Document,
    error::Error,
    predicate::Predicate,
    store::{DocumentStore, FindQuery, SortKey},
    value::Value,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

///
/// SortSpec
///
/// Primary sort field and direction. The id field is always appended as the
/// secondary key in the same direction.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortSpec {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }
}

///
/// Page
///
/// One page of rows plus the cursor that continues after its last row.
/// `has_more` is `items.len() == limit`, so a walk whose size is an exact
/// multiple of the limit ends with one empty page.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub items: Vec<Document>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

impl Page {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Opaque token form of `next_cursor`.
    #[must_use]
    pub fn next_token(&self) -> Option<String> {
        self.next_cursor.as_ref().map(Cursor::encode)
    }

    /// Consume this page and return `(items, next_cursor)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Document>, Option<Cursor>) {
        (self.items, self.next_cursor)
    }
}

///
/// KeysetPaginator
///

#[derive(Debug)]
pub struct KeysetPaginator<S> {
    store: S,
    collection: String,
    id_field: String,
}

impl<S: DocumentStore> KeysetPaginator<S> {
    #[must_use]
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            id_field: "_id".to_string(),
        }
    }

    /// Name the unique tie-break field (defaults to `_id`).
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Rows strictly after `cursor` in `[sort, id]` order.
    #[must_use]
    pub fn continuation(&self, sort: &SortSpec, cursor: &Cursor) -> Predicate {
        let after = |field: &str, value| match sort.direction {
            Direction::Asc => Predicate::gt(field, value),
            Direction::Desc => Predicate::lt(field, value),
        };

        Predicate::or(vec![
            after(&sort.field, cursor.value.clone()),
            Predicate::and(vec![
                Predicate::eq(sort.field.as_str(), cursor.value.clone()),
                after(&self.id_field, Value::Text(cursor.id.clone())),
            ]),
        ])
    }

    /// Fetch up to `limit` rows matching `base` after `cursor`.
    pub async fn page(
        &self,
        base: &Predicate,
        sort: &SortSpec,
        limit: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page, Error> {
        if limit == 0 {
            return Err(Error::InvalidPageLimit);
        }

        let filter = match cursor {
            Some(cursor) => Predicate::conjoin(base.clone(), self.continuation(sort, cursor)),
            None => base.clone(),
        };

        let mut query = FindQuery::new(filter)
            .sort_by(SortKey::new(sort.field.as_str(), sort.direction))
            .limit(limit);
        if sort.field != self.id_field {
            query = query.sort_by(SortKey::new(self.id_field.as_str(), sort.direction));
        }

        let items = self.store.find(&self.collection, &query).await?;
        let next_cursor = items
            .last()
            .map(|doc| Cursor::from_document(doc, &sort.field, &self.id_field));
        let has_more = items.len() == limit;

        debug!(
            collection = %self.collection,
            rows = items.len(),
            has_more,
            continued = cursor.is_some(),
            "fetched page"
        );

        Ok(Page {
            items,
            next_cursor,
            has_more,
        })
    }

    /// Like [`page`](Self::page), continuing from an opaque cursor token.
    pub async fn page_after_token(
        &self,
        base: &Predicate,
        sort: &SortSpec,
        limit: usize,
        token: Option<&str>,
    ) -> Result<Page, Error> {
        let cursor = token.map(Cursor::decode).transpose()?;

        self.page(base, sort, limit, cursor.as_ref()).await
    }

    /// Walk every page until `has_more` is false and return all rows in
    /// sort order.
    pub async fn stream_all(
        &self,
        base: &Predicate,
        sort: &SortSpec,
        limit: usize,
    ) -> Result<Vec<Document>, Error> {
        let mut rows = Vec::new();
        let mut cursor: Option<Cursor> = None;

        loop {
            let page = self.page(base, sort, limit, cursor.as_ref()).await?;
            let has_more = page.has_more;
            let (items, next_cursor) = page.into_parts();
            rows.extend(items);

            match next_cursor {
                Some(next) if has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(rows)
    }
}

///
/// TESTS
///
