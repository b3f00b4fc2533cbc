use crate::{
    predicate::Predicate,
    random::RandomSource,
    store::{DocumentStore, StoreError},
    strategy::StrategyContext,
    value::{Value, canonical_cmp, values_equal},
};
use tracing::trace;

// Range-by-percentile.
//
// Sorts a bounded random sample by one numeric or timestamp field and takes
// a contiguous window whose length is proportional to the aimed fraction.
// Fields whose sampled values are mostly distinct are preferred: a window
// over a field with few distinct values can only hit counts in coarse
// steps. The window start is random so repeated attempts cover different
// regions.
pub(super) async fn propose<S: DocumentStore>(
    ctx: &StrategyContext<'_, S>,
    rng: &mut dyn RandomSource,
) -> Result<Option<Predicate>, StoreError> {
    let mut fields: Vec<&str> = ctx.profiled_numeric_fields().collect();
    if ctx.snapshot.timestamp_range.is_some()
        && let Some(field) = ctx.schema.timestamp_field.as_deref()
    {
        fields.push(field);
    }
    if fields.is_empty() {
        return Ok(None);
    }

    let size = ctx
        .config
        .sample_size
        .min(usize::try_from(ctx.total()).unwrap_or(usize::MAX));
    let seed = rng.next_u64();

    let sample = ctx
        .store
        .sample(&ctx.schema.collection, size, seed)
        .await?;

    let columns: Vec<(&str, Vec<Value>)> = fields
        .into_iter()
        .map(|field| {
            let mut values: Vec<Value> = sample
                .iter()
                .map(|doc| doc.value_of(field, &ctx.schema.id_field))
                .filter(|value| value.as_f64().is_some())
                .collect();
            values.sort_by(canonical_cmp);
            (field, values)
        })
        .filter(|(_, values)| values.len() >= 2)
        .collect();
    if columns.is_empty() {
        return Ok(None);
    }

    let fine: Vec<usize> = (0..columns.len())
        .filter(|index| is_fine_grained(&columns[*index].1))
        .collect();
    let index = if fine.is_empty() {
        rng.below(columns.len())
    } else {
        fine[rng.below(fine.len())]
    };
    let (field, values) = &columns[index];

    let n = values.len();
    let window = window_len(n, ctx.fraction());
    let start = rng.below(n - window + 1);
    let end = start + window - 1;

    trace!(field, sampled = n, window, start, "range window");

    Ok(Some(Predicate::range(
        *field,
        Some(values[start].clone()),
        Some(values[end].clone()),
    )))
}

// At least half of the sorted values are distinct.
pub(super) fn is_fine_grained(sorted: &[Value]) -> bool {
    let distinct = 1 + sorted
        .windows(2)
        .filter(|pair| !values_equal(&pair[0], &pair[1]))
        .count();

    distinct * 2 >= sorted.len()
}

// Window length for `n` sorted samples; always within `1..=n`.
pub(super) fn window_len(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round() as usize).clamp(1, n)
}
