use crate::{
    predicate::Predicate,
    strategy::StrategyKind,
    value::{Timestamp, Value},
};

// Position of the adjustable range inside the anchor predicate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    Root,
    Clause(usize),
}

///
/// BoundSearch
///
/// Converges one counted range candidate onto an aimed count by moving its
/// upper bound. The lower bound and any sibling clauses stay fixed, so the
/// count is monotone in the upper bound: each observation either brackets
/// the aim from below or from above, and the next bound interpolates
/// between the tightest pair. With only one side known, the width is
/// scaled by `aim / count` from the lower bound.
///
/// The search gives up once a bound repeats or a count repeats, which is
/// what a field with coarse values (small integers) produces.
///

#[derive(Clone, Debug)]
pub struct BoundSearch {
    origin: StrategyKind,
    anchor: Predicate,
    slot: Slot,
    field: String,
    lower: Value,
    lower_at: f64,
    timestamp: bool,
    observed: Vec<(f64, u64)>,
    pending: Option<f64>,
    exhausted: bool,
}

impl BoundSearch {
    /// Start from a candidate `origin` proposed and the store counted.
    /// Applies to a closed numeric or timestamp range with `min < max`,
    /// alone or as a clause of a conjunction, with a non-zero count.
    #[must_use]
    pub fn from_candidate(origin: StrategyKind, predicate: &Predicate, count: u64) -> Option<Self> {
        if count == 0 {
            return None;
        }

        let (slot, range) = match predicate {
            Predicate::Range { .. } => (Slot::Root, predicate),
            Predicate::And { clauses } => clauses
                .iter()
                .enumerate()
                .find(|(_, clause)| matches!(clause, Predicate::Range { .. }))
                .map(|(index, clause)| (Slot::Clause(index), clause))?,
            _ => return None,
        };
        let Predicate::Range {
            field,
            min: Some(lower),
            max: Some(upper),
        } = range
        else {
            return None;
        };

        let lower_at = lower.as_f64()?;
        let upper_at = upper.as_f64()?;
        if !lower_at.is_finite() || !upper_at.is_finite() || upper_at <= lower_at {
            return None;
        }

        Some(Self {
            origin,
            anchor: predicate.clone(),
            slot,
            field: field.clone(),
            lower: lower.clone(),
            lower_at,
            timestamp: matches!(lower, Value::Timestamp(_)),
            observed: vec![(upper_at, count)],
            pending: None,
            exhausted: false,
        })
    }

    /// Strategy whose candidate anchors this search.
    #[must_use]
    pub const fn origin(&self) -> StrategyKind {
        self.origin
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Next candidate aimed at `aim`, or `None` once the search is spent.
    pub fn next(&mut self, aim: u64) -> Option<Predicate> {
        if self.exhausted {
            return None;
        }

        let Some(upper) = self.next_upper(aim) else {
            self.exhausted = true;
            return None;
        };
        self.pending = Some(upper);

        Some(self.with_upper(upper))
    }

    /// Record the count of the candidate last returned by [`next`](Self::next).
    pub fn observe(&mut self, count: u64) {
        let Some(upper) = self.pending.take() else {
            return;
        };

        if self.observed.iter().any(|(_, seen)| *seen == count) {
            self.exhausted = true;
        }
        self.observed.push((upper, count));
    }

    fn next_upper(&self, aim: u64) -> Option<f64> {
        let below = self
            .observed
            .iter()
            .filter(|(_, count)| *count < aim)
            .max_by(|left, right| left.0.total_cmp(&right.0))
            .copied();
        let above = self
            .observed
            .iter()
            .filter(|(_, count)| *count > aim)
            .min_by(|left, right| left.0.total_cmp(&right.0))
            .copied();

        let aim = aim as f64;
        let upper = match (below, above) {
            (below, Some((above_at, above_count))) => {
                let (below_at, below_count) = below.unwrap_or((self.lower_at, 0));
                let share = (aim - below_count as f64) / (above_count - below_count) as f64;
                share.mul_add(above_at - below_at, below_at)
            }
            (Some((below_at, 0)), None) => 2.0f64.mul_add(below_at - self.lower_at, self.lower_at),
            (Some((below_at, below_count)), None) => {
                (below_at - self.lower_at).mul_add(aim / below_count as f64, self.lower_at)
            }
            (None, None) => return None,
        };
        let upper = if self.timestamp { upper.round() } else { upper };

        let resolution = if self.timestamp {
            0.5
        } else {
            f64::EPSILON * upper.abs().max(1.0)
        };
        let repeated = self
            .observed
            .iter()
            .any(|(seen, _)| (seen - upper).abs() <= resolution);

        (upper.is_finite() && upper > self.lower_at && !repeated).then_some(upper)
    }

    fn with_upper(&self, upper: f64) -> Predicate {
        let bound = if self.timestamp {
            Value::Timestamp(Timestamp::from_millis(upper as i64))
        } else {
            Value::Float(upper)
        };
        let range = Predicate::range(self.field.as_str(), Some(self.lower.clone()), Some(bound));

        match (self.slot, &self.anchor) {
            (Slot::Clause(index), Predicate::And { clauses }) => {
                let mut clauses = clauses.clone();
                clauses[index] = range;
                Predicate::and(clauses)
            }
            _ => range,
        }
    }
}
