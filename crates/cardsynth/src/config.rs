//! Module: config
//! Responsibility: tunables for synthesis runs.

use crate::{
    CONJUNCTIVE_FRACTION_LIMIT, DEFAULT_ATTEMPT_BUDGET, DEFAULT_MARGIN_RATIO, DEFAULT_SAMPLE_SIZE,
    error::Error,
};
use serde::{Deserialize, Serialize};

///
/// StrategyWeights
///
/// Relative probability of each strategy leading an attempt.
/// Weights need not sum to one; zero removes a strategy from the lead draw
/// but keeps it as a fall-through.
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub range_percentile: f64,
    pub categorical_cover: f64,
    pub conjunctive: f64,
    pub fallback_range: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            range_percentile: 0.4,
            categorical_cover: 0.3,
            conjunctive: 0.2,
            fallback_range: 0.1,
        }
    }
}

///
/// SynthConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Maximum number of strategy attempts per target.
    pub attempt_budget: usize,

    /// Tolerance above the target, as a fraction of the target.
    pub margin_ratio: f64,

    /// Upper bound on documents drawn by sampling strategies.
    pub sample_size: usize,

    /// Target fraction below which conjunctive refinement may run.
    pub conjunctive_limit: f64,

    /// Fixed seed for reproducible runs; fresh entropy per run when absent.
    pub seed: Option<u64>,

    pub weights: StrategyWeights,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            attempt_budget: DEFAULT_ATTEMPT_BUDGET,
            margin_ratio: DEFAULT_MARGIN_RATIO,
            sample_size: DEFAULT_SAMPLE_SIZE,
            conjunctive_limit: CONJUNCTIVE_FRACTION_LIMIT,
            seed: None,
            weights: StrategyWeights::default(),
        }
    }
}

impl SynthConfig {
    /// Parse a (possibly partial) JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn with_attempt_budget(mut self, budget: usize) -> Self {
        self.attempt_budget = budget;
        self
    }

    /// Reject values that would make synthesis meaningless.
    pub fn validate(&self) -> Result<(), Error> {
        if self.attempt_budget == 0 {
            return Err(Error::Config("attempt_budget must be at least 1".to_string()));
        }
        if !(self.margin_ratio >= 0.0 && self.margin_ratio.is_finite()) {
            return Err(Error::Config(
                "margin_ratio must be a finite, non-negative fraction".to_string(),
            ));
        }
        if self.sample_size == 0 {
            return Err(Error::Config("sample_size must be at least 1".to_string()));
        }

        let w = &self.weights;
        let weights = [
            w.range_percentile,
            w.categorical_cover,
            w.conjunctive,
            w.fallback_range,
        ];
        if weights.iter().any(|w| !(*w >= 0.0 && w.is_finite())) {
            return Err(Error::Config(
                "strategy weights must be finite and non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

///
/// TESTS
///
