//! Module: filterset
//! Responsibility: the persisted filter-set artifact produced by batch
//! synthesis, and reuse of it across runs.
//! Does not own: synthesis itself (see `synth`).

use crate::{
    error::{Error, FilterSetError},
    predicate::Predicate,
    store::DocumentStore,
    synth::{SynthesisResult, Synthesizer},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

///
/// FilterSetEntry
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterSetEntry {
    pub target_count: u64,
    pub actual_count: u64,
    pub margin: u64,
    pub within_margin: bool,
    pub filter: Predicate,
}

impl From<&SynthesisResult> for FilterSetEntry {
    fn from(result: &SynthesisResult) -> Self {
        Self {
            target_count: result.target_count,
            actual_count: result.count,
            margin: result.margin,
            within_margin: result.within_margin(),
            filter: result.predicate.clone(),
        }
    }
}

///
/// FilterSet
///
/// One synthesized predicate per target count, for one collection. Written
/// once per batch run and read back by later runs.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FilterSet {
    pub collection: String,
    pub entries: Vec<FilterSetEntry>,
}

impl FilterSet {
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            entries: Vec::new(),
        }
    }

    /// Entry for `target`, if one was synthesized.
    #[must_use]
    pub fn get(&self, target: u64) -> Option<&FilterSetEntry> {
        self.entries.iter().find(|entry| entry.target_count == target)
    }

    /// True when every target in `targets` has an entry.
    #[must_use]
    pub fn covers(&self, targets: &[u64]) -> bool {
        targets.iter().all(|target| self.get(*target).is_some())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = fs::read(path).map_err(FilterSetError::from)?;
        let set = serde_json::from_slice(&bytes).map_err(FilterSetError::from)?;

        Ok(set)
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(FilterSetError::from)?;
        }

        let json = serde_json::to_vec_pretty(self).map_err(FilterSetError::from)?;
        fs::write(path, json).map_err(FilterSetError::from)?;

        Ok(())
    }
}

/// Synthesize one entry per target, in the given order.
pub async fn synthesize_batch<S: DocumentStore>(
    synth: &Synthesizer<S>,
    targets: &[u64],
) -> Result<FilterSet, Error> {
    let mut set = FilterSet::new(synth.profiler().schema().collection.as_str());

    for target in targets {
        let result = synth.synthesize(*target).await?;
        set.entries.push(FilterSetEntry::from(&result));
    }

    Ok(set)
}

/// Reuse the filter set at `path` when it covers every target of the same
/// collection; otherwise synthesize the batch and overwrite the file.
///
/// A missing file triggers synthesis. A malformed one is an error.
pub async fn load_or_synthesize<S: DocumentStore>(
    synth: &Synthesizer<S>,
    path: &Path,
    targets: &[u64],
) -> Result<FilterSet, Error> {
    let collection = synth.profiler().schema().collection.as_str();

    if path.exists() {
        let existing = FilterSet::load(path)?;
        if existing.collection == collection && existing.covers(targets) {
            info!(
                collection,
                path = %path.display(),
                entries = existing.entries.len(),
                "reusing stored filter set"
            );

            return Ok(existing);
        }
    }

    let set = synthesize_batch(synth, targets).await?;
    set.save(path)?;
    info!(
        collection,
        path = %path.display(),
        entries = set.entries.len(),
        "wrote filter set"
    );

    Ok(set)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{FilterSet, load_or_synthesize, synthesize_batch};
    use crate::{
        config::SynthConfig,
        error::{Error, FilterSetError},
        synth::Synthesizer,
        test_support::{CountingStore, users_fixture, users_schema},
    };
    use serde_json::json;
    use std::fs;

    fn synth(seed: u64) -> Synthesizer<CountingStore<crate::store::MemoryStore>> {
        Synthesizer::new(
            CountingStore::new(users_fixture(400)),
            users_schema(),
            SynthConfig::default().with_seed(seed),
        )
        .expect("config should be valid")
    }

    #[tokio::test]
    async fn batch_keeps_target_order_and_flags() {
        let synth = synth(5);

        let set = synthesize_batch(&synth, &[100, 10, 400])
            .await
            .expect("batch should succeed");

        assert_eq!(set.collection, "users");
        assert_eq!(
            set.entries.iter().map(|e| e.target_count).collect::<Vec<_>>(),
            vec![100, 10, 400]
        );
        for entry in &set.entries {
            let in_window = entry.actual_count >= entry.target_count
                && entry.actual_count <= entry.target_count + entry.margin;
            assert_eq!(entry.within_margin, in_window);
        }
    }

    #[test]
    fn file_format_is_stable_json() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("filters.json");
        fs::write(
            &path,
            json!({
                "collection": "users",
                "entries": [{
                    "target_count": 10,
                    "actual_count": 11,
                    "margin": 1,
                    "within_margin": true,
                    "filter": { "op": "eq", "field": "plan", "value": "pro" }
                }]
            })
            .to_string(),
        )
        .expect("fixture file should be written");

        let set = FilterSet::load(&path).expect("file should load");

        assert!(set.covers(&[10]));
        assert!(!set.covers(&[10, 20]));
        assert_eq!(set.get(10).map(|e| e.actual_count), Some(11));
    }

    #[tokio::test]
    async fn second_run_reuses_the_stored_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("nested").join("filters.json");
        let targets = [20, 150];

        let first = load_or_synthesize(&synth(9), &path, &targets)
            .await
            .expect("first run should synthesize");

        let rerun = synth(9);
        let second = load_or_synthesize(&rerun, &path, &targets)
            .await
            .expect("second run should load");

        assert_eq!(first, second);
        assert_eq!(rerun.profiler().store().count_calls(), 0);
        assert_eq!(rerun.profiler().store().aggregate_calls(), 0);
    }

    #[tokio::test]
    async fn missing_target_triggers_resynthesis() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("filters.json");

        load_or_synthesize(&synth(1), &path, &[30])
            .await
            .expect("first run should synthesize");

        let rerun = synth(1);
        let set = load_or_synthesize(&rerun, &path, &[30, 60])
            .await
            .expect("second run should synthesize");

        assert!(set.covers(&[30, 60]));
        assert!(rerun.profiler().store().count_calls() > 0);
        assert_eq!(FilterSet::load(&path).expect("file should load"), set);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("filters.json");
        fs::write(&path, "{ not json").expect("fixture file should be written");

        let err = load_or_synthesize(&synth(1), &path, &[30])
            .await
            .expect_err("malformed file must not be overwritten");

        assert!(matches!(err, Error::FilterSet(FilterSetError::Json(_))));
    }
}
