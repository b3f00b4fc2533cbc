//! Module: strategy
//! Responsibility: proposing candidate predicates for a target count.
//! Does not own: counting candidates or deciding acceptance (see `synth`).
//! Boundary: strategies read the snapshot and may draw an explicit sample;
//! they never mutate shared state.

mod categorical;
mod conjunctive;
mod fallback;
mod range;
mod refine;


use crate::{
    config::{StrategyWeights, SynthConfig},
    document::CollectionSchema,
    predicate::Predicate,
    profile::DistributionSnapshot,
    random::RandomSource,
    store::{DocumentStore, StoreError},
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use refine::BoundSearch;

// Weight multiplier for strategies whose candidates proved unproductive
// earlier in the same synthesis run.
const UNPRODUCTIVE_WEIGHT_FACTOR: f64 = 0.1;

///
/// StrategyKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RangePercentile,
    CategoricalCover,
    Conjunctive,
    FallbackRange,
    /// Upper-bound adjustment of an already counted range candidate.
    RangeRefinement,
    /// Match-all shortcut for targets at or above the collection size.
    MatchAll,
    /// Empty id membership for a zero target.
    MatchNone,
}

impl StrategyKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RangePercentile => "range_percentile",
            Self::CategoricalCover => "categorical_cover",
            Self::Conjunctive => "conjunctive",
            Self::FallbackRange => "fallback_range",
            Self::RangeRefinement => "range_refinement",
            Self::MatchAll => "match_all",
            Self::MatchNone => "match_none",
        }
    }

    /// Run this strategy once. Refinement needs a measured candidate (see
    /// [`BoundSearch`]) and never proposes from the snapshot alone.
    pub async fn propose<S: DocumentStore>(
        self,
        ctx: &StrategyContext<'_, S>,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Predicate>, StoreError> {
        match self {
            Self::RangePercentile => range::propose(ctx, rng).await,
            Self::CategoricalCover => Ok(categorical::propose(ctx, rng)),
            Self::Conjunctive => Ok(conjunctive::propose(ctx, rng)),
            Self::FallbackRange => Ok(fallback::propose(ctx)),
            Self::RangeRefinement => Ok(None),
            Self::MatchAll => Ok(Some(Predicate::All)),
            Self::MatchNone => Ok(Some(Predicate::in_(
                ctx.schema.id_field.as_str(),
                Vec::new(),
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// StrategyContext
///
/// Everything one proposal may consult: the profiled snapshot, the schema,
/// the store (for explicit sampling only) and the acceptable count window.
/// Proposals size themselves for the middle of the window, since the
/// window only extends above the target.
///

pub struct StrategyContext<'a, S> {
    pub store: &'a S,
    pub schema: &'a CollectionSchema,
    pub snapshot: &'a DistributionSnapshot,
    pub config: &'a SynthConfig,
    pub target: u64,
    pub margin: u64,
}

impl<S> StrategyContext<'_, S> {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.snapshot.total_count
    }

    /// Count proposals aim for: the midpoint of `[target, target + margin]`.
    #[must_use]
    pub const fn aim(&self) -> u64 {
        self.target.saturating_add(self.margin / 2)
    }

    /// Aimed count as a fraction of the collection.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }

        (self.aim() as f64 / self.total() as f64).clamp(0.0, 1.0)
    }

    /// Inclusive upper bound of the acceptable count window.
    #[must_use]
    pub const fn upper(&self) -> u64 {
        self.target.saturating_add(self.margin)
    }

    /// Numeric fields with usable profiled statistics, in schema order.
    pub(crate) fn profiled_numeric_fields(&self) -> impl Iterator<Item = &str> {
        self.schema
            .numeric_fields
            .iter()
            .filter(|field| self.snapshot.numeric.contains_key(field.as_str()))
            .map(String::as_str)
    }
}

///
/// Proposal
///

#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    pub predicate: Predicate,
    pub strategy: StrategyKind,
}

///
/// StrategyPlan
///
/// Explicit weighted list of strategy variants. Each attempt draws a lead
/// variant by weight, then falls through the remaining variants in list
/// order until one is applicable.
///

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyPlan {
    entries: Vec<(StrategyKind, f64)>,
}

impl StrategyPlan {
    #[must_use]
    pub fn new(entries: Vec<(StrategyKind, f64)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn from_weights(weights: &StrategyWeights) -> Self {
        Self::new(vec![
            (StrategyKind::RangePercentile, weights.range_percentile),
            (StrategyKind::CategoricalCover, weights.categorical_cover),
            (StrategyKind::Conjunctive, weights.conjunctive),
            (StrategyKind::FallbackRange, weights.fallback_range),
        ])
    }

    #[must_use]
    pub fn entries(&self) -> &[(StrategyKind, f64)] {
        &self.entries
    }

    /// Try order for one attempt: a lead drawn by the history-adjusted
    /// weights, then the remaining variants in list order.
    pub fn attempt_order(
        &self,
        rng: &mut dyn RandomSource,
        history: &DispatchHistory,
    ) -> Vec<StrategyKind> {
        let total: f64 = self
            .entries
            .iter()
            .map(|(kind, weight)| history.weight(*kind, *weight))
            .sum();

        let mut lead = self.entries.first().map(|(kind, _)| *kind);
        if total > 0.0 {
            let mut draw = rng.next_f64() * total;
            // Rounding can leave the draw past the last bucket; the last
            // positively weighted entry absorbs it.
            for (kind, weight) in &self.entries {
                let weight = history.weight(*kind, *weight);
                if weight <= 0.0 {
                    continue;
                }
                lead = Some(*kind);
                if draw < weight {
                    break;
                }
                draw -= weight;
            }
        }

        let mut order: Vec<StrategyKind> = lead.into_iter().collect();
        order.extend(
            self.entries
                .iter()
                .map(|(kind, _)| *kind)
                .filter(|kind| Some(*kind) != lead),
        );

        order
    }

    /// Run one attempt: the first applicable variant in attempt order wins.
    pub async fn propose<S: DocumentStore>(
        &self,
        ctx: &StrategyContext<'_, S>,
        rng: &mut dyn RandomSource,
        history: &DispatchHistory,
    ) -> Result<Option<Proposal>, StoreError> {
        for strategy in self.attempt_order(rng, history) {
            if let Some(predicate) = strategy.propose(ctx, rng).await? {
                return Ok(Some(Proposal {
                    predicate,
                    strategy,
                }));
            }
        }

        Ok(None)
    }
}

///
/// DispatchHistory
///
/// Per-run bookkeeping that skews the weighted lead draw. The previous
/// lead has its weight halved so consecutive attempts tend to vary, and
/// strategies marked unproductive keep a tenth of their weight.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchHistory {
    previous_lead: Option<StrategyKind>,
    unproductive: Vec<StrategyKind>,
}

impl DispatchHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous_lead: None,
            unproductive: Vec::new(),
        }
    }

    /// Record the strategy that produced the latest candidate.
    pub const fn led(&mut self, kind: StrategyKind) {
        self.previous_lead = Some(kind);
    }

    /// Demote `kind` for the rest of the run.
    pub fn mark_unproductive(&mut self, kind: StrategyKind) {
        if !self.unproductive.contains(&kind) {
            self.unproductive.push(kind);
        }
    }

    #[must_use]
    pub fn is_unproductive(&self, kind: StrategyKind) -> bool {
        self.unproductive.contains(&kind)
    }

    /// Effective draw weight for `kind` given its configured weight.
    #[must_use]
    pub fn weight(&self, kind: StrategyKind, weight: f64) -> f64 {
        let mut weight = weight;
        if self.previous_lead == Some(kind) {
            weight /= 2.0;
        }
        if self.is_unproductive(kind) {
            weight *= UNPRODUCTIVE_WEIGHT_FACTOR;
        }

        weight
    }
}
