use crate::{
    document::Document,
    predicate::Predicate,
    store::{
        DocumentStore, FindQuery, GroupCount, GroupKey, StoreError, Summary, SummarySpec,
    },
};
use async_trait::async_trait;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

///
/// CountingStore
///
/// Wraps a store and records every call, plus the result of every count.
/// Can be switched to fail count queries.
///

#[derive(Debug)]
pub(crate) struct CountingStore<S> {
    inner: S,
    counts: AtomicUsize,
    finds: AtomicUsize,
    samples: AtomicUsize,
    aggregates: AtomicUsize,
    fail_counts: AtomicBool,
    observed: Mutex<Vec<u64>>,
}

impl<S> CountingStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            counts: AtomicUsize::new(0),
            finds: AtomicUsize::new(0),
            samples: AtomicUsize::new(0),
            aggregates: AtomicUsize::new(0),
            fail_counts: AtomicBool::new(false),
            observed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_counts(self) -> Self {
        self.fail_counts.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) const fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn count_calls(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub(crate) fn sample_calls(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub(crate) fn aggregate_calls(&self) -> usize {
        self.aggregates.load(Ordering::SeqCst)
    }

    /// Every count result in issue order.
    pub(crate) fn observed_counts(&self) -> Vec<u64> {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CountingStore<S> {
    async fn count(&self, collection: &str, filter: &Predicate) -> Result<u64, StoreError> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection reset"));
        }

        let count = self.inner.count(collection, filter).await?;
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(count);

        Ok(count)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(collection, query).await
    }

    async fn sample(
        &self,
        collection: &str,
        size: usize,
        seed: u64,
    ) -> Result<Vec<Document>, StoreError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.inner.sample(collection, size, seed).await
    }

    async fn summarize(
        &self,
        collection: &str,
        spec: &SummarySpec,
    ) -> Result<Summary, StoreError> {
        self.aggregates.fetch_add(1, Ordering::SeqCst);
        self.inner.summarize(collection, spec).await
    }

    async fn group_count(
        &self,
        collection: &str,
        key: &GroupKey,
    ) -> Result<Vec<GroupCount>, StoreError> {
        self.aggregates.fetch_add(1, Ordering::SeqCst);
        self.inner.group_count(collection, key).await
    }
}
