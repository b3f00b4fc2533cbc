use crate::{predicate::Predicate, strategy::StrategyContext};

// Fallback range: the first profiled numeric field, from its minimum, with
// a width proportional to the target fraction. Fully deterministic.
pub(super) fn propose<S>(ctx: &StrategyContext<'_, S>) -> Option<Predicate> {
    let field = ctx.profiled_numeric_fields().next()?;
    let stats = ctx.snapshot.numeric[field];
    let upper = ctx.fraction().mul_add(stats.span(), stats.min);

    Some(Predicate::between(field, stats.min, upper))
}
