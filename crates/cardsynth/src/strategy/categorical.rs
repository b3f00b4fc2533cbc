use crate::{
    predicate::Predicate,
    random::RandomSource,
    store::GroupCount,
    strategy::StrategyContext,
    value::Value,
};

// Categorical set-cover.
//
// Greedy knapsack over one field's value frequencies: values are visited by
// descending count and kept while the running total stays within the
// acceptable window. If that never reaches the target, more values are
// added until it does, accepting an overshoot.
pub(super) fn propose<S>(
    ctx: &StrategyContext<'_, S>,
    rng: &mut dyn RandomSource,
) -> Option<Predicate> {
    let eligible: Vec<(&str, &[GroupCount])> = ctx
        .snapshot
        .filterable_categories()
        .filter(|(_, stats)| stats.distinct() >= 2)
        .map(|(field, stats)| (field, stats.ranked()))
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let (field, ranked) = eligible[rng.below(eligible.len())];
    let chosen = cover(ranked, ctx.target, ctx.upper())?;

    Some(if chosen.len() == 1 {
        Predicate::eq(field, chosen.into_iter().next().unwrap_or_default())
    } else {
        Predicate::in_(field, chosen)
    })
}

// Select values whose summed counts reach `target`, preferring sums that
// stay at or below `upper`.
pub(super) fn cover(ranked: &[GroupCount], target: u64, upper: u64) -> Option<Vec<Value>> {
    let candidates: Vec<&GroupCount> = ranked.iter().filter(|g| !g.value.is_null()).collect();

    let mut taken = vec![false; candidates.len()];
    let mut cumulative = 0_u64;

    for (idx, group) in candidates.iter().enumerate() {
        if cumulative >= target {
            break;
        }
        if cumulative + group.count <= upper {
            taken[idx] = true;
            cumulative += group.count;
        }
    }

    // Packing fell short: keep adding the smallest value that reaches the
    // target, or the largest remaining one when none does.
    while cumulative < target {
        let remaining = candidates
            .iter()
            .enumerate()
            .filter(|(idx, _)| !taken[*idx]);
        let reaching = remaining
            .clone()
            .filter(|(_, group)| cumulative + group.count >= target)
            .min_by_key(|(_, group)| group.count);
        let next = reaching.or_else(|| remaining.max_by_key(|(_, group)| group.count));

        let Some((idx, group)) = next else {
            break;
        };
        taken[idx] = true;
        cumulative += group.count;
    }

    let chosen: Vec<Value> = candidates
        .iter()
        .zip(taken)
        .filter(|(_, taken)| *taken)
        .map(|(group, _)| group.value.clone())
        .collect();

    (!chosen.is_empty()).then_some(chosen)
}
