//! Module: store
//! Responsibility: the document-database collaborator boundary.
//! Does not own: connection lifecycle, seeding, or query planning.
//! Boundary: every count, read, sample and aggregate issued by synthesis
//! and pagination flows through `DocumentStore`.

mod memory;

use crate::{
    direction::Direction,
    document::{DerivedField, Document},
    predicate::Predicate,
    value::{Timestamp, Value},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error as ThisError;

// re-exports
pub use memory::MemoryStore;

///
/// StoreErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreErrorKind {
    Unavailable,
    Query,
    Unsupported,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unavailable => "unavailable",
            Self::Query => "query",
            Self::Unsupported => "unsupported",
        };

        f.write_str(label)
    }
}

///
/// StoreError
///
/// Failure reported by the database client. Never retried or masked by the
/// engine; it propagates to the caller unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("store {kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Query, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unsupported, message)
    }
}

///
/// SortKey
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    #[must_use]
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

///
/// FindQuery
///
/// Filtered, sorted, windowed read. `skip` and `limit` are the store's
/// range-skip paging primitives; keyset pagination leaves `skip` at zero.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FindQuery {
    pub filter: Predicate,
    pub sort: Vec<SortKey>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindQuery {
    #[must_use]
    pub const fn new(filter: Predicate) -> Self {
        Self {
            filter,
            sort: Vec::new(),
            skip: 0,
            limit: None,
        }
    }

    #[must_use]
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

///
/// SummarySpec
///
/// Fields covered by the single summary aggregate pass.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SummarySpec {
    pub numeric_fields: Vec<String>,
    pub boolean_fields: Vec<String>,
    pub timestamp_field: Option<String>,
}

///
/// NumericStats
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl NumericStats {
    /// Width of the observed value span.
    #[must_use]
    pub fn span(&self) -> f64 {
        (self.max - self.min).max(0.0)
    }
}

///
/// TimestampRange
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TimestampRange {
    pub min: Timestamp,
    pub max: Timestamp,
}

///
/// Summary
///
/// Output of the summary aggregate. Numeric fields with no numeric values
/// are absent from `numeric`.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub count: u64,
    pub numeric: BTreeMap<String, NumericStats>,
    pub true_counts: BTreeMap<String, u64>,
    pub timestamp_range: Option<TimestampRange>,
}

///
/// GroupKey
///
/// Grouping expression for a group-by count pass.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupKey {
    Field(String),
    Derived(DerivedField),
}

impl GroupKey {
    /// Name the grouping pass reports under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(field) => field,
            Self::Derived(derived) => &derived.name,
        }
    }
}

///
/// GroupCount
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GroupCount {
    pub value: Value,
    pub count: u64,
}

///
/// DocumentStore
///
/// Asynchronous client for one document database. Implementations must
/// return identical counts for identical predicates on an unmodified
/// collection.
///

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Exact number of documents matching `filter`.
    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError>;

    /// Filtered, sorted, windowed read.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    /// Up to `size` documents drawn uniformly without replacement.
    /// `seed` makes the draw reproducible where the backend supports it.
    async fn sample(
        &self,
        collection: &str,
        size: usize,
        seed: u64,
    ) -> Result<Vec<Document>, StoreError>;

    /// Single-pass summary aggregate.
    async fn summarize(&self, collection: &str, spec: &SummarySpec)
    -> Result<Summary, StoreError>;

    /// Group-by count over one key.
    async fn group_count(
        &self,
        collection: &str,
        key: &GroupKey,
    ) -> Result<Vec<GroupCount>, StoreError>;
}

#[async_trait]
impl<'a, S: DocumentStore + ?Sized> DocumentStore for &'a S {
    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        (**self).count(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).find(collection, query).await
    }

    async fn sample(
        &self,
        collection: &str,
        size: usize,
        seed: u64,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).sample(collection, size, seed).await
    }

    async fn summarize(
        &self,
        collection: &str,
        spec: &SummarySpec,
    ) -> Result<Summary, StoreError> {
        (**self).summarize(collection, spec).await
    }

    async fn group_count(
        &self,
        collection: &str,
        key: &GroupKey,
    ) -> Result<Vec<GroupCount>, StoreError> {
        (**self).group_count(collection, key).await
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        (**self).count(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).find(collection, query).await
    }

    async fn sample(
        &self,
        collection: &str,
        size: usize,
        seed: u64,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).sample(collection, size, seed).await
    }

    async fn summarize(
        &self,
        collection: &str,
        spec: &SummarySpec,
    ) -> Result<Summary, StoreError> {
        (**self).summarize(collection, spec).await
    }

    async fn group_count(
        &self,
        collection: &str,
        key: &GroupKey,
    ) -> Result<Vec<GroupCount>, StoreError> {
        (**self).group_count(collection, key).await
    }
}
