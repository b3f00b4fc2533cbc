//! Module: synth
//! Responsibility: driving strategy attempts toward a target match count.
//! Does not own: candidate generation (see `strategy`) or profiling.
//! Boundary: every candidate is counted against the live store; the
//! snapshot is only used to steer proposals.

use crate::{
    config::SynthConfig,
    document::CollectionSchema,
    error::Error,
    predicate::Predicate,
    profile::Profiler,
    random::{RandomSource, SeededRandom},
    search::{SearchSpace, search},
    store::DocumentStore,
    strategy::{BoundSearch, DispatchHistory, Proposal, StrategyContext, StrategyKind, StrategyPlan},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

///
/// SynthesisResult
///
/// Outcome of one `synthesize` call. A result outside the margin is the
/// best candidate seen, not a failure.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub predicate: Predicate,
    pub count: u64,
    pub target_count: u64,
    pub margin: u64,
    pub attempts: usize,
    pub strategy: StrategyKind,
}

impl SynthesisResult {
    /// True when `target_count <= count <= target_count + margin`.
    #[must_use]
    pub const fn within_margin(&self) -> bool {
        self.distance() == 0
    }

    /// Gap between `count` and the acceptable window.
    #[must_use]
    pub const fn distance(&self) -> u64 {
        window_distance(self.count, self.target_count, self.margin)
    }
}

///
/// Synthesizer
///
/// Convergence controller. Holds a shared profiler so the snapshot is
/// computed once across many targets.
///

pub struct Synthesizer<S> {
    profiler: Arc<Profiler<S>>,
    config: SynthConfig,
    plan: StrategyPlan,
}

impl<S: DocumentStore> Synthesizer<S> {
    pub fn new(store: S, schema: CollectionSchema, config: SynthConfig) -> Result<Self, Error> {
        Self::with_profiler(Arc::new(Profiler::new(store, schema)), config)
    }

    pub fn with_profiler(profiler: Arc<Profiler<S>>, config: SynthConfig) -> Result<Self, Error> {
        config.validate()?;
        let plan = StrategyPlan::from_weights(&config.weights);

        Ok(Self {
            profiler,
            config,
            plan,
        })
    }

    /// Replace the strategy list derived from the configured weights.
    #[must_use]
    pub fn with_plan(mut self, plan: StrategyPlan) -> Self {
        self.plan = plan;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SynthConfig {
        &self.config
    }

    #[must_use]
    pub const fn profiler(&self) -> &Arc<Profiler<S>> {
        &self.profiler
    }

    #[must_use]
    pub const fn plan(&self) -> &StrategyPlan {
        &self.plan
    }

    /// Drop the cached snapshot so the next synthesis profiles again.
    ///
    /// Only possible while this synthesizer is the profiler's sole owner;
    /// returns `false` and leaves the cache alone when it is shared.
    pub fn invalidate_profile(&mut self) -> bool {
        match Arc::get_mut(&mut self.profiler) {
            Some(profiler) => {
                profiler.invalidate();
                true
            }
            None => false,
        }
    }

    /// Synthesize with the configured seed, or fresh entropy when unset.
    pub async fn synthesize(&self, target: u64) -> Result<SynthesisResult, Error> {
        let mut rng = self
            .config
            .seed
            .map_or_else(SeededRandom::from_entropy, SeededRandom::new);
        debug!(seed = rng.seed(), target_count = target, "synthesis seed");

        self.synthesize_with(target, &mut rng).await
    }

    /// Synthesize with an explicit random source.
    pub async fn synthesize_with(
        &self,
        target: u64,
        rng: &mut dyn RandomSource,
    ) -> Result<SynthesisResult, Error> {
        let snapshot = self.profiler.profile().await?;
        let schema = self.profiler.schema();
        let total = snapshot.total_count;
        let margin = margin_for(target, self.config.margin_ratio);

        let shortcut = |predicate, count, strategy| SynthesisResult {
            predicate,
            count,
            target_count: target,
            margin,
            attempts: 0,
            strategy,
        };
        if target >= total {
            return Ok(shortcut(Predicate::All, total, StrategyKind::MatchAll));
        }
        if target == 0 {
            let none = Predicate::in_(schema.id_field.as_str(), Vec::new());

            return Ok(shortcut(none, 0, StrategyKind::MatchNone));
        }

        let mut space = SynthSpace {
            ctx: StrategyContext {
                store: self.profiler.store(),
                schema,
                snapshot: &snapshot,
                config: &self.config,
                target,
                margin,
            },
            plan: &self.plan,
            rng,
            history: DispatchHistory::new(),
            bounds: None,
        };
        let outcome = search(&mut space, self.config.attempt_budget).await?;

        let result = match outcome.best {
            Some(best) => SynthesisResult {
                predicate: best.candidate.predicate,
                count: best.measure,
                target_count: target,
                margin,
                attempts: outcome.attempts,
                strategy: best.candidate.strategy,
            },
            None => {
                warn!(
                    collection = %schema.collection,
                    target_count = target,
                    attempts = outcome.attempts,
                    "no strategy applied; falling back to match-all"
                );

                SynthesisResult {
                    predicate: Predicate::All,
                    count: total,
                    target_count: target,
                    margin,
                    attempts: outcome.attempts,
                    strategy: StrategyKind::MatchAll,
                }
            }
        };

        if result.within_margin() {
            info!(
                target_count = target,
                count = result.count,
                attempts = result.attempts,
                strategy = %result.strategy,
                "synthesized predicate"
            );
        } else {
            warn!(
                target_count = target,
                count = result.count,
                distance = result.distance(),
                attempts = result.attempts,
                "best-effort predicate misses tolerance"
            );
        }

        Ok(result)
    }
}

// Attempt loop state for one target. While `bounds` holds a refinable
// candidate, attempts adjust it; otherwise the plan proposes afresh.
struct SynthSpace<'a, 'r, S> {
    ctx: StrategyContext<'a, S>,
    plan: &'a StrategyPlan,
    rng: &'r mut dyn RandomSource,
    history: DispatchHistory,
    bounds: Option<BoundSearch>,
}

#[async_trait]
impl<'a, 'r, S: DocumentStore> SearchSpace for SynthSpace<'a, 'r, S> {
    type Candidate = Proposal;
    type Measure = u64;
    type Error = Error;

    async fn generate(&mut self, attempt: usize) -> Result<Option<Proposal>, Error> {
        if let Some(bounds) = &mut self.bounds {
            if let Some(predicate) = bounds.next(self.ctx.aim()) {
                return Ok(Some(Proposal {
                    predicate,
                    strategy: StrategyKind::RangeRefinement,
                }));
            }

            debug!(
                target_count = self.ctx.target,
                origin = %bounds.origin(),
                "refinement exhausted"
            );
            self.history.mark_unproductive(bounds.origin());
            self.bounds = None;
        }

        let proposal = self
            .plan
            .propose(&self.ctx, &mut *self.rng, &self.history)
            .await?;

        if let Some(proposal) = &proposal {
            self.history.led(proposal.strategy);
        } else {
            let skipped = Error::NoApplicableStrategy { attempt };
            debug!(target_count = self.ctx.target, %skipped, "attempt skipped");
        }

        Ok(proposal)
    }

    async fn measure(&mut self, candidate: &Proposal) -> Result<u64, Error> {
        let count = self
            .ctx
            .store
            .count(&self.ctx.schema.collection, &candidate.predicate)
            .await?;
        let distance = self.distance(&count);

        debug!(
            target_count = self.ctx.target,
            strategy = %candidate.strategy,
            count,
            distance,
            filter = %candidate.predicate,
            "attempt counted"
        );

        if candidate.strategy == StrategyKind::RangeRefinement {
            if let Some(bounds) = &mut self.bounds {
                bounds.observe(count);
            }
        } else {
            // Far misses demote the strategy for the rest of the run.
            if distance > self.ctx.target {
                self.history.mark_unproductive(candidate.strategy);
            }
            if distance > 0 {
                self.bounds =
                    BoundSearch::from_candidate(candidate.strategy, &candidate.predicate, count);
            }
        }

        Ok(count)
    }

    fn distance(&self, count: &u64) -> u64 {
        window_distance(*count, self.ctx.target, self.ctx.margin)
    }
}

/// Tolerance above `target`: `ceil(target * ratio)`.
#[must_use]
pub fn margin_for(target: u64, ratio: f64) -> u64 {
    (target as f64 * ratio).ceil() as u64
}

// Zero inside `[target, target + margin]`, else the gap to the nearer bound.
const fn window_distance(count: u64, target: u64, margin: u64) -> u64 {
    let upper = target.saturating_add(margin);

    if count < target {
        target - count
    } else if count > upper {
        count - upper
    } else {
        0
    }
}

///
/// TESTS
///
