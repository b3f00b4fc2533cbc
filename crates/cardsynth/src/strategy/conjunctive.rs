use crate::{predicate::Predicate, random::RandomSource, strategy::StrategyContext};

// Conjunctive refinement.
//
// For small targets, ANDs a numeric range with up to two equality
// constraints. Each extra constraint's selectivity is divided out of the
// target fraction, so the numeric range only carries what is left; with a
// categorical value near sqrt(fraction) the range spans about
// sqrt(fraction) of the field.
pub(super) fn propose<S>(
    ctx: &StrategyContext<'_, S>,
    rng: &mut dyn RandomSource,
) -> Option<Predicate> {
    let fraction = ctx.fraction();
    if fraction <= 0.0 || fraction >= ctx.config.conjunctive_limit {
        return None;
    }

    let numeric: Vec<&str> = ctx
        .profiled_numeric_fields()
        .filter(|field| ctx.snapshot.numeric[*field].span() > 0.0)
        .collect();
    if numeric.is_empty() {
        return None;
    }
    let field = numeric[rng.below(numeric.len())];
    let stats = ctx.snapshot.numeric[field];

    let total = ctx.total() as f64;
    let mut remaining = fraction;
    let mut constraints = Vec::new();

    // Categorical value whose frequency is closest to sqrt(fraction).
    let categories: Vec<_> = ctx
        .snapshot
        .filterable_categories()
        .filter(|(_, stats)| stats.distinct() >= 2)
        .collect();
    if !categories.is_empty() {
        let (cat_field, cat_stats) = categories[rng.below(categories.len())];
        let goal = fraction.sqrt();
        let closest = cat_stats
            .ranked()
            .iter()
            .filter(|group| !group.value.is_null())
            .min_by(|left, right| {
                let left = (left.count as f64 / total - goal).abs();
                let right = (right.count as f64 / total - goal).abs();
                left.total_cmp(&right)
            });

        if let Some(group) = closest {
            let selectivity = group.count as f64 / total;
            if selectivity >= remaining {
                constraints.push(Predicate::eq(cat_field, group.value.clone()));
                remaining /= selectivity;
            }
        }
    }

    // Optional boolean constraint on its majority side.
    if !ctx.schema.boolean_fields.is_empty() && rng.chance(0.5) {
        let bool_field = &ctx.schema.boolean_fields[rng.below(ctx.schema.boolean_fields.len())];
        if let Some(true_fraction) = ctx.snapshot.true_fraction(bool_field) {
            let side = true_fraction >= 0.5;
            let selectivity = if side { true_fraction } else { 1.0 - true_fraction };
            if selectivity > 0.0 && selectivity >= remaining {
                constraints.push(Predicate::eq(bool_field.as_str(), side));
                remaining /= selectivity;
            }
        }
    }

    let span = stats.span();
    let width = remaining.min(1.0) * span;
    let lower = stats.min + rng.next_f64() * (span - width);
    let range = Predicate::between(field, lower, lower + width);

    if constraints.is_empty() {
        return Some(range);
    }

    let mut clauses = vec![range];
    clauses.extend(constraints);

    Some(Predicate::and(clauses))
}
