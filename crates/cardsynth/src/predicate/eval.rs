use crate::{
    document::Document,
    predicate::Predicate,
    value::{Value, canonical_cmp, values_equal},
};
use std::cmp::Ordering;

impl Predicate {
    /// Evaluate this predicate against one document.
    ///
    /// Missing attributes read as `Null`. Ranges never match `Null`; strict
    /// comparisons follow the canonical total order so keyset continuation
    /// stays total over any mix of values.
    #[must_use]
    pub fn matches(&self, doc: &Document, id_field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => values_equal(&doc.value_of(field, id_field), value),
            Self::Range { field, min, max } => {
                in_range(&doc.value_of(field, id_field), min.as_ref(), max.as_ref())
            }
            Self::In { field, values } => {
                let actual = doc.value_of(field, id_field);
                values.iter().any(|candidate| values_equal(&actual, candidate))
            }
            Self::Gt { field, value } => {
                canonical_cmp(&doc.value_of(field, id_field), value) == Ordering::Greater
            }
            Self::Lt { field, value } => {
                canonical_cmp(&doc.value_of(field, id_field), value) == Ordering::Less
            }
            Self::And { clauses } => clauses.iter().all(|clause| clause.matches(doc, id_field)),
            Self::Or { clauses } => clauses.iter().any(|clause| clause.matches(doc, id_field)),
        }
    }
}

fn in_range(actual: &Value, min: Option<&Value>, max: Option<&Value>) -> bool {
    if actual.is_null() {
        return false;
    }

    let above_min = min.is_none_or(|min| canonical_cmp(actual, min) != Ordering::Less);
    let below_max = max.is_none_or(|max| canonical_cmp(actual, max) != Ordering::Greater);

    above_min && below_max
}
