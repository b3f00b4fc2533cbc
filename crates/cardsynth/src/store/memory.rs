use crate::{
    document::Document,
    predicate::Predicate,
    store::{
        DocumentStore, FindQuery, GroupCount, GroupKey, NumericStats, StoreError, Summary,
        SummarySpec, TimestampRange,
    },
    value::{Value, canonical_cmp},
};
use async_trait::async_trait;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock},
};

///
/// MemoryStore
///
/// In-process document store holding named collections in memory.
/// Counts, reads and aggregates are evaluated by full scan; it is the
/// reference collaborator for tests and small local benchmarks.
///

#[derive(Debug)]
pub struct MemoryStore {
    id_field: String,
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_field("_id")
    }

    /// Create a store whose predicates address the document id as `id_field`.
    #[must_use]
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Append documents to a collection, creating it on first use.
    pub fn insert_many(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Number of stored documents in a collection (zero when absent).
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.with_docs(collection, <[Document]>::len)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn with_docs<R>(&self, collection: &str, f: impl FnOnce(&[Document]) -> R) -> R {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let docs = collections.get(collection).map_or(&[][..], Vec::as_slice);

        f(docs)
    }

    fn matching<'a>(&self, docs: &'a [Document], filter: &Predicate) -> Vec<&'a Document> {
        docs.iter()
            .filter(|doc| filter.matches(doc, &self.id_field))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        Ok(self.with_docs(collection, |docs| self.matching(docs, filter).len() as u64))
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        Ok(self.with_docs(collection, |docs| {
            let mut rows = self.matching(docs, &query.filter);

            rows.sort_by(|left, right| {
                for key in &query.sort {
                    let ordering = canonical_cmp(
                        &left.value_of(&key.field, &self.id_field),
                        &right.value_of(&key.field, &self.id_field),
                    );
                    let ordering = key.direction.apply(ordering);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }

                Ordering::Equal
            });

            rows.into_iter()
                .skip(query.skip)
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        }))
    }

    async fn sample(
        &self,
        collection: &str,
        size: usize,
        seed: u64,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self.with_docs(collection, |docs| {
            let take = size.min(docs.len());
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut indices: Vec<usize> = (0..docs.len()).collect();

            // Partial Fisher-Yates: the first `take` slots are a uniform draw.
            for slot in 0..take {
                let remaining = (indices.len() - slot) as u64;
                let pick = slot + (rng.next_u64() % remaining) as usize;
                indices.swap(slot, pick);
            }

            indices[..take].iter().map(|&idx| docs[idx].clone()).collect()
        }))
    }

    async fn summarize(
        &self,
        collection: &str,
        spec: &SummarySpec,
    ) -> Result<Summary, StoreError> {
        Ok(self.with_docs(collection, |docs| summarize_docs(docs, spec)))
    }

    async fn group_count(
        &self,
        collection: &str,
        key: &GroupKey,
    ) -> Result<Vec<GroupCount>, StoreError> {
        Ok(self.with_docs(collection, |docs| {
            let mut values: Vec<Value> = docs
                .iter()
                .map(|doc| match key {
                    GroupKey::Field(field) => doc.value_of(field, &self.id_field),
                    GroupKey::Derived(derived) => {
                        derived.derive(&doc.value_of(&derived.source, &self.id_field))
                    }
                })
                .collect();
            values.sort_by(canonical_cmp);

            let mut groups: Vec<GroupCount> = Vec::new();
            for value in values {
                match groups.last_mut() {
                    Some(last) if canonical_cmp(&last.value, &value) == Ordering::Equal => {
                        last.count += 1;
                    }
                    _ => groups.push(GroupCount { value, count: 1 }),
                }
            }

            groups
        }))
    }
}

///
/// NumericAccumulator
///

#[derive(Clone, Copy, Debug)]
struct NumericAccumulator {
    min: f64,
    max: f64,
    sum: f64,
    seen: u64,
}

impl NumericAccumulator {
    const fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            seen: 0,
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.seen += 1;
    }

    fn finish(self) -> Option<NumericStats> {
        (self.seen > 0).then(|| NumericStats {
            min: self.min,
            max: self.max,
            avg: self.sum / self.seen as f64,
        })
    }
}

fn summarize_docs(docs: &[Document], spec: &SummarySpec) -> Summary {
    let mut numeric: BTreeMap<&str, NumericAccumulator> = spec
        .numeric_fields
        .iter()
        .map(|field| (field.as_str(), NumericAccumulator::new()))
        .collect();
    let mut true_counts: BTreeMap<String, u64> = spec
        .boolean_fields
        .iter()
        .map(|field| (field.clone(), 0))
        .collect();
    let mut timestamp_range: Option<TimestampRange> = None;

    for doc in docs {
        for (field, acc) in &mut numeric {
            if let Some(value) = doc.get(field).and_then(numeric_value) {
                acc.push(value);
            }
        }

        for (field, count) in &mut true_counts {
            if doc.get(field).and_then(Value::as_bool) == Some(true) {
                *count += 1;
            }
        }

        if let Some(Value::Timestamp(ts)) = spec.timestamp_field.as_deref().and_then(|f| doc.get(f))
        {
            timestamp_range = Some(match timestamp_range {
                Some(range) => TimestampRange {
                    min: range.min.min(*ts),
                    max: range.max.max(*ts),
                },
                None => TimestampRange { min: *ts, max: *ts },
            });
        }
    }

    Summary {
        count: docs.len() as u64,
        numeric: numeric
            .into_iter()
            .filter_map(|(field, acc)| acc.finish().map(|stats| (field.to_string(), stats)))
            .collect(),
        true_counts,
        timestamp_range,
    }
}

// Only plain numbers contribute to numeric aggregates.
const fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::{
        direction::Direction,
        document::{DerivedField, Document},
        predicate::Predicate,
        store::{DocumentStore, FindQuery, GroupKey, SortKey, SummarySpec},
        value::{Timestamp, Value},
    };

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_many(
            "users",
            vec![
                Document::new("u1")
                    .with("age", 20)
                    .with("active", true)
                    .with("email", "a@x.org")
                    .with("created", Timestamp::from_millis(10)),
                Document::new("u2")
                    .with("age", 40)
                    .with("active", false)
                    .with("email", "b@y.org")
                    .with("created", Timestamp::from_millis(30)),
                Document::new("u3")
                    .with("age", 30)
                    .with("active", true)
                    .with("email", "c@x.org")
                    .with("created", Timestamp::from_millis(20)),
            ],
        );
        store
    }

    #[tokio::test]
    async fn find_sorts_skips_and_limits() {
        let store = store();
        let query = FindQuery::new(Predicate::All)
            .sort_by(SortKey::new("age", Direction::Desc))
            .skip(1)
            .limit(1);

        let rows = store.find("users", &query).await.expect("find should succeed");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "u3");
    }

    #[tokio::test]
    async fn summarize_reports_numeric_boolean_and_timestamp_stats() {
        let store = store();
        let spec = SummarySpec {
            numeric_fields: vec!["age".to_string(), "missing".to_string()],
            boolean_fields: vec!["active".to_string()],
            timestamp_field: Some("created".to_string()),
        };

        let summary = store
            .summarize("users", &spec)
            .await
            .expect("summary should succeed");

        assert_eq!(summary.count, 3);
        let age = summary.numeric["age"];
        assert!((age.min - 20.0).abs() < f64::EPSILON);
        assert!((age.max - 40.0).abs() < f64::EPSILON);
        assert!((age.avg - 30.0).abs() < f64::EPSILON);
        assert!(!summary.numeric.contains_key("missing"));
        assert_eq!(summary.true_counts["active"], 2);

        let range = summary.timestamp_range.expect("timestamps should be summarized");
        assert_eq!(range.min, Timestamp::from_millis(10));
        assert_eq!(range.max, Timestamp::from_millis(30));
    }

    #[tokio::test]
    async fn group_count_supports_derived_keys() {
        let store = store();
        let key = GroupKey::Derived(DerivedField::new("domain", "email", "@", 1));

        let groups = store
            .group_count("users", &key)
            .await
            .expect("group count should succeed");

        let pairs: Vec<(Value, u64)> = groups.into_iter().map(|g| (g.value, g.count)).collect();
        assert_eq!(
            pairs,
            vec![(Value::from("x.org"), 2), (Value::from("y.org"), 1)]
        );
    }

    #[tokio::test]
    async fn sample_is_bounded_and_reproducible() {
        let store = store();

        let first = store.sample("users", 2, 7).await.expect("sample should succeed");
        let second = store.sample("users", 2, 7).await.expect("sample should succeed");
        let all = store.sample("users", 10, 7).await.expect("sample should succeed");

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn missing_collection_reads_as_empty() {
        let store = MemoryStore::new();

        let count = store
            .count("nothing", &Predicate::All)
            .await
            .expect("count should succeed");

        assert_eq!(count, 0);
        assert!(store.is_empty("nothing"));
    }
}
