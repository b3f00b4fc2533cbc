//! Module: profile
//! Responsibility: computing and caching the distribution snapshot of one
//! collection.
//! Does not own: predicate generation or counting.
//! Boundary: strategies read the snapshot; only the profiler issues
//! aggregate queries.

use crate::{
    document::CollectionSchema,
    error::Error,
    store::{DocumentStore, GroupCount, GroupKey, StoreError, SummarySpec},
    value::canonical_cmp,
};
use futures::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};
use tracing::{debug, info};

// re-exports
pub use crate::store::{NumericStats, TimestampRange};

///
/// CategoricalStats
///
/// Value frequencies for one grouping pass, ranked by descending count
/// (ties by canonical value order). Derived partitions are profiled but
/// cannot be constrained by a predicate.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CategoricalStats {
    pub derived: bool,
    pub counts: Vec<GroupCount>,
}

impl CategoricalStats {
    #[must_use]
    pub fn new(derived: bool, mut counts: Vec<GroupCount>) -> Self {
        counts.sort_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| canonical_cmp(&left.value, &right.value))
        });

        Self { derived, counts }
    }

    /// Values by descending frequency.
    #[must_use]
    pub fn ranked(&self) -> &[GroupCount] {
        &self.counts
    }

    #[must_use]
    pub const fn distinct(&self) -> usize {
        self.counts.len()
    }
}

///
/// DistributionSnapshot
///
/// Immutable summary of a collection at one point in time. Shared as an
/// `Arc` by every synthesis call; it is never refreshed implicitly, so it
/// goes stale if the collection is written to.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DistributionSnapshot {
    pub total_count: u64,
    pub numeric: BTreeMap<String, NumericStats>,
    pub categorical: BTreeMap<String, CategoricalStats>,
    pub boolean_true_counts: BTreeMap<String, u64>,
    pub timestamp_range: Option<TimestampRange>,
}

impl DistributionSnapshot {
    /// Categorical fields usable in predicates, in name order.
    pub fn filterable_categories(&self) -> impl Iterator<Item = (&str, &CategoricalStats)> {
        self.categorical
            .iter()
            .filter(|(_, stats)| !stats.derived)
            .map(|(field, stats)| (field.as_str(), stats))
    }

    /// Fraction of documents with `field == true`.
    #[must_use]
    pub fn true_fraction(&self, field: &str) -> Option<f64> {
        if self.total_count == 0 {
            return None;
        }

        self.boolean_true_counts
            .get(field)
            .map(|count| *count as f64 / self.total_count as f64)
    }
}

///
/// Profiler
///
/// Memoizing front for the aggregate queries. The first `profile` call runs
/// one summary pass and one grouping pass per categorical and derived field
/// concurrently; later calls return the cached snapshot without I/O.
///

#[derive(Debug)]
pub struct Profiler<S> {
    store: S,
    schema: CollectionSchema,
    cache: OnceLock<Arc<DistributionSnapshot>>,
}

impl<S: DocumentStore> Profiler<S> {
    #[must_use]
    pub const fn new(store: S, schema: CollectionSchema) -> Self {
        Self {
            store,
            schema,
            cache: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Cached snapshot, if one has been computed.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<DistributionSnapshot>> {
        self.cache.get().cloned()
    }

    /// Drop the cached snapshot; the next `profile` call recomputes it.
    pub fn invalidate(&mut self) {
        self.cache = OnceLock::new();
    }

    /// Return the snapshot, computing it on first use.
    ///
    /// Concurrent first callers may each compute a snapshot; the first one
    /// stored wins and the others are discarded.
    pub async fn profile(&self) -> Result<Arc<DistributionSnapshot>, Error> {
        if let Some(snapshot) = self.cache.get() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(self.compute().await?);
        if self.cache.set(Arc::clone(&snapshot)).is_err() {
            debug!(
                collection = %self.schema.collection,
                "profile raced with another caller; keeping the stored snapshot"
            );
        }

        Ok(self.cache.get().cloned().unwrap_or(snapshot))
    }

    async fn compute(&self) -> Result<DistributionSnapshot, Error> {
        let collection = self.schema.collection.as_str();
        let spec = SummarySpec {
            numeric_fields: self.schema.numeric_fields.clone(),
            boolean_fields: self.schema.boolean_fields.clone(),
            timestamp_field: self.schema.timestamp_field.clone(),
        };

        let group_keys: Vec<GroupKey> = self
            .schema
            .categorical_fields
            .iter()
            .cloned()
            .map(GroupKey::Field)
            .chain(self.schema.derived_fields.iter().cloned().map(GroupKey::Derived))
            .collect();

        let grouping = try_join_all(group_keys.iter().map(|key| async move {
            let counts = self.store.group_count(collection, key).await?;

            Ok::<_, StoreError>((
                key.name().to_string(),
                CategoricalStats::new(matches!(key, GroupKey::Derived(_)), counts),
            ))
        }));

        let (summary, groups) = try_join(self.store.summarize(collection, &spec), grouping).await?;

        if summary.count == 0 {
            return Err(Error::EmptyCollection {
                collection: collection.to_string(),
            });
        }

        info!(
            collection,
            total = summary.count,
            numeric = summary.numeric.len(),
            categorical = groups.len(),
            "profiled collection"
        );

        Ok(DistributionSnapshot {
            total_count: summary.count,
            numeric: summary.numeric,
            categorical: groups.into_iter().collect(),
            boolean_true_counts: summary.true_counts,
            timestamp_range: summary.timestamp_range,
        })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::Profiler;
    use crate::{
        error::Error,
        store::MemoryStore,
        test_support::{CountingStore, users_fixture, users_schema},
        value::Value,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn profile_summarizes_every_field_class() {
        let store = users_fixture(200);
        let profiler = Profiler::new(store, users_schema());

        let snapshot = profiler.profile().await.expect("profile should succeed");

        assert_eq!(snapshot.total_count, 200);
        assert!(snapshot.numeric.contains_key("age"));
        assert!(snapshot.numeric.contains_key("score"));
        assert!(snapshot.boolean_true_counts.contains_key("active"));
        assert!(snapshot.timestamp_range.is_some());

        let country = &snapshot.categorical["country"];
        assert!(!country.derived);
        assert_eq!(
            country.ranked().iter().map(|g| g.count).sum::<u64>(),
            200,
            "grouping pass must partition the collection"
        );
        assert!(
            country
                .ranked()
                .windows(2)
                .all(|pair| pair[0].count >= pair[1].count),
            "values must be ranked by descending frequency"
        );

        let domain = &snapshot.categorical["email_domain"];
        assert!(domain.derived);
        assert!(
            domain
                .ranked()
                .iter()
                .all(|g| matches!(&g.value, Value::Text(text) if text.ends_with(".org")))
        );
        assert_eq!(snapshot.filterable_categories().count(), 2);
    }

    #[tokio::test]
    async fn second_profile_is_memoized() {
        let store = CountingStore::new(users_fixture(50));
        let profiler = Profiler::new(store, users_schema());

        let first = profiler.profile().await.expect("profile should succeed");
        let aggregates_after_first = profiler.store().aggregate_calls();
        let second = profiler.profile().await.expect("profile should succeed");

        assert_eq!(*first, *second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(aggregates_after_first, 4, "one summary and three grouping passes");
        assert_eq!(profiler.store().aggregate_calls(), aggregates_after_first);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let store = CountingStore::new(users_fixture(20));
        let mut profiler = Profiler::new(store, users_schema());

        profiler.profile().await.expect("profile should succeed");
        profiler.invalidate();
        assert!(profiler.cached().is_none());
        profiler.profile().await.expect("profile should succeed");

        assert_eq!(profiler.store().aggregate_calls(), 8);
    }

    #[tokio::test]
    async fn empty_collection_is_fatal() {
        let profiler = Profiler::new(MemoryStore::new(), users_schema());

        let err = profiler.profile().await.expect_err("empty collection must fail");

        assert!(matches!(err, Error::EmptyCollection { collection } if collection == "users"));
        assert!(profiler.cached().is_none());
    }
}
