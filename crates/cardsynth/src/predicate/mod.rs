mod eval;
mod render;


use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr};

///
/// Predicate
///
/// Structured boolean filter over document attributes.
/// This is the wire contract handed to the store: it serializes to a tagged
/// JSON tree for filter-set persistence and renders to a document-database
/// filter for logging.
///
/// Synthesis only produces `All`, `Eq`, `Range`, `In`, `And` and `Or`.
/// `Gt` and `Lt` are strict comparisons used by keyset continuation.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    All,
    Eq {
        field: String,
        value: Value,
    },
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Value>,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    Gt {
        field: String,
        value: Value,
    },
    Lt {
        field: String,
        value: Value,
    },
    And {
        clauses: Vec<Self>,
    },
    Or {
        clauses: Vec<Self>,
    },
}

impl Predicate {
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inclusive range; either bound may be open.
    #[must_use]
    pub fn range(field: impl Into<String>, min: Option<Value>, max: Option<Value>) -> Self {
        Self::Range {
            field: field.into(),
            min,
            max,
        }
    }

    /// Inclusive range with both bounds present.
    #[must_use]
    pub fn between(field: impl Into<String>, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::range(field, Some(min.into()), Some(max.into()))
    }

    #[must_use]
    pub fn in_(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn and(clauses: Vec<Self>) -> Self {
        Self::And { clauses }
    }

    #[must_use]
    pub const fn or(clauses: Vec<Self>) -> Self {
        Self::Or { clauses }
    }

    /// Conjoin two predicates, eliding `All` operands.
    #[must_use]
    pub fn conjoin(left: Self, right: Self) -> Self {
        match (left, right) {
            (Self::All, other) | (other, Self::All) => other,
            (left, right) => Self::and(vec![left, right]),
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Logical nesting depth: leaves are 0, each `And`/`Or` adds one level.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::And { clauses } | Self::Or { clauses } => {
                1 + clauses.iter().map(Self::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Number of leaf constraints in this tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And { clauses } | Self::Or { clauses } => {
                clauses.iter().map(Self::leaf_count).sum()
            }
            Self::All => 0,
            _ => 1,
        }
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::conjoin(self, rhs)
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::or(vec![self, rhs])
    }
}
