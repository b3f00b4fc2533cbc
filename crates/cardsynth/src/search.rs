//! Module: search
//! Responsibility: bounded best-of-N local search over generated candidates.
//! Does not own: candidate generation or scoring semantics.
//! Boundary: callers supply a `SearchSpace`; this module only drives the
//! attempt loop and keeps the best candidate.

use async_trait::async_trait;
use tracing::trace;

///
/// SearchSpace
///
/// A source of candidates plus a way to measure them. `distance` is zero for
/// an acceptable candidate and grows with how far the measure misses.
///

#[async_trait]
pub trait SearchSpace: Send {
    type Candidate: Send + Sync;
    type Measure: Send;
    type Error: Send;

    /// Produce the candidate for one attempt (1-based). `None` marks an
    /// attempt with nothing to offer; it still consumes budget.
    async fn generate(&mut self, attempt: usize) -> Result<Option<Self::Candidate>, Self::Error>;

    async fn measure(&mut self, candidate: &Self::Candidate) -> Result<Self::Measure, Self::Error>;

    fn distance(&self, measure: &Self::Measure) -> u64;
}

///
/// Scored
///

#[derive(Clone, Debug, PartialEq)]
pub struct Scored<C, M> {
    pub candidate: C,
    pub measure: M,
    pub distance: u64,
    pub attempt: usize,
}

///
/// SearchOutcome
///
/// Best candidate seen (first one on ties) and how many attempts ran.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome<C, M> {
    pub best: Option<Scored<C, M>>,
    pub attempts: usize,
}

impl<C, M> SearchOutcome<C, M> {
    /// True when the best candidate is acceptable.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.best.as_ref().is_some_and(|best| best.distance == 0)
    }
}

/// Run up to `budget` attempts, stopping early on a zero-distance candidate.
///
/// Errors from the space abort the search and propagate unchanged.
pub async fn search<P: SearchSpace>(
    space: &mut P,
    budget: usize,
) -> Result<SearchOutcome<P::Candidate, P::Measure>, P::Error> {
    let mut best: Option<Scored<P::Candidate, P::Measure>> = None;
    let mut attempts = 0;

    for attempt in 1..=budget {
        attempts = attempt;

        let Some(candidate) = space.generate(attempt).await? else {
            continue;
        };
        let measure = space.measure(&candidate).await?;
        let distance = space.distance(&measure);

        let improved = best.as_ref().is_none_or(|b| distance < b.distance);
        trace!(attempt, distance, improved, "search attempt");

        if improved {
            best = Some(Scored {
                candidate,
                measure,
                distance,
                attempt,
            });
        }
        if distance == 0 {
            break;
        }
    }

    Ok(SearchOutcome { best, attempts })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{SearchSpace, search};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use proptest::prelude::*;

    // Replays scripted candidates; distance is the absolute gap to `goal`.
    struct Scripted {
        script: Vec<Option<i64>>,
        goal: i64,
        measured: usize,
        fail_at: Option<usize>,
    }

    impl Scripted {
        fn new(script: Vec<Option<i64>>, goal: i64) -> Self {
            Self {
                script,
                goal,
                measured: 0,
                fail_at: None,
            }
        }
    }

    #[async_trait]
    impl SearchSpace for Scripted {
        type Candidate = i64;
        type Measure = i64;
        type Error = String;

        async fn generate(&mut self, attempt: usize) -> Result<Option<i64>, String> {
            if self.fail_at == Some(attempt) {
                return Err(format!("attempt {attempt} failed"));
            }

            Ok(self.script.get(attempt - 1).copied().flatten())
        }

        async fn measure(&mut self, candidate: &i64) -> Result<i64, String> {
            self.measured += 1;
            Ok(*candidate)
        }

        fn distance(&self, measure: &i64) -> u64 {
            measure.abs_diff(self.goal)
        }
    }

    #[test]
    fn stops_at_first_acceptable_candidate() {
        let mut space = Scripted::new(vec![Some(3), Some(10), Some(10), Some(1)], 10);

        let outcome = block_on(search(&mut space, 10)).expect("search should succeed");

        let best = outcome.best.as_ref().expect("a candidate was measured");
        assert!(outcome.converged());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(best.attempt, 2);
        assert_eq!(space.measured, 2);
    }

    #[test]
    fn keeps_first_of_equally_good_candidates() {
        let mut space = Scripted::new(vec![Some(7), Some(13), Some(4)], 10);

        let outcome = block_on(search(&mut space, 3)).expect("search should succeed");

        let best = outcome.best.expect("a candidate was measured");
        assert_eq!(best.candidate, 7);
        assert_eq!(best.distance, 3);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn empty_attempts_consume_budget() {
        let mut space = Scripted::new(vec![None, None, Some(9)], 10);

        let outcome = block_on(search(&mut space, 2)).expect("search should succeed");

        assert_eq!(outcome.best, None);
        assert_eq!(outcome.attempts, 2);
        assert!(!outcome.converged());
    }

    #[test]
    fn space_errors_abort_the_search() {
        let mut space = Scripted::new(vec![Some(1), Some(2), Some(3)], 10);
        space.fail_at = Some(2);

        let err = block_on(search(&mut space, 3)).expect_err("failure should propagate");

        assert_eq!(err, "attempt 2 failed");
        assert_eq!(space.measured, 1);
    }

    proptest! {
        #[test]
        fn best_is_minimum_over_measured(
            script in prop::collection::vec(prop::option::of(-50_i64..50), 0..12),
            goal in -50_i64..50,
            budget in 0_usize..16,
        ) {
            let mut space = Scripted::new(script.clone(), goal);
            let outcome = block_on(search(&mut space, budget)).expect("search should succeed");

            let seen: Vec<i64> = script
                .iter()
                .take(outcome.attempts)
                .filter_map(|c| *c)
                .collect();
            let min = seen.iter().map(|c| c.abs_diff(goal)).min();

            prop_assert_eq!(outcome.best.as_ref().map(|b| b.distance), min);
            prop_assert!(outcome.attempts <= budget);
            if !outcome.converged() {
                prop_assert_eq!(outcome.attempts, budget);
            }
        }
    }
}
