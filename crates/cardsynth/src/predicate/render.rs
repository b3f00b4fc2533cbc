use crate::{predicate::Predicate, value::Value};
use serde_json::{Map, Value as Json, json};
use std::fmt;

impl Predicate {
    /// Render this predicate as a document-database filter document
    /// (`$gte`/`$lte`/`$in`/`$and`/`$or`), the form logged next to counts.
    #[must_use]
    pub fn to_filter(&self) -> Json {
        match self {
            Self::All => Json::Object(Map::new()),
            Self::Eq { field, value } => json!({ field: to_json(value) }),
            Self::Range { field, min, max } => {
                let mut bounds = Map::new();
                if let Some(min) = min {
                    bounds.insert("$gte".to_string(), to_json(min));
                }
                if let Some(max) = max {
                    bounds.insert("$lte".to_string(), to_json(max));
                }

                json!({ field: Json::Object(bounds) })
            }
            Self::In { field, values } => {
                let values: Vec<Json> = values.iter().map(to_json).collect();
                json!({ field: { "$in": values } })
            }
            Self::Gt { field, value } => json!({ field: { "$gt": to_json(value) } }),
            Self::Lt { field, value } => json!({ field: { "$lt": to_json(value) } }),
            Self::And { clauses } => {
                let clauses: Vec<Json> = clauses.iter().map(Self::to_filter).collect();
                json!({ "$and": clauses })
            }
            Self::Or { clauses } => {
                let clauses: Vec<Json> = clauses.iter().map(Self::to_filter).collect();
                json!({ "$or": clauses })
            }
        }
    }
}

fn to_json(value: &Value) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Eq { field, value } => write!(f, "{field} = {value}"),
            Self::Range { field, min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "{field} in [{min}, {max}]"),
                (Some(min), None) => write!(f, "{field} >= {min}"),
                (None, Some(max)) => write!(f, "{field} <= {max}"),
                (None, None) => write!(f, "{field} is set"),
            },
            Self::In { field, values } => {
                write!(f, "{field} in {{")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
            Self::Gt { field, value } => write!(f, "{field} > {value}"),
            Self::Lt { field, value } => write!(f, "{field} < {value}"),
            Self::And { clauses } => write_joined(f, clauses, " AND "),
            Self::Or { clauses } => write_joined(f, clauses, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, clauses: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (idx, clause) in clauses.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{clause}")?;
    }
    f.write_str(")")
}
