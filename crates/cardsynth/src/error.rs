use crate::{cursor::CursorDecodeError, store::StoreError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Crate-level error taxonomy.
///
/// Failing to converge is not an error: it is reported through
/// `SynthesisResult::within_margin`. `NoApplicableStrategy` is raised per
/// attempt, logged, and consumed by the attempt loop.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("collection '{collection}' is empty; nothing to profile")]
    EmptyCollection { collection: String },

    #[error("no strategy produced a candidate on attempt {attempt}")]
    NoApplicableStrategy { attempt: usize },

    #[error("page limit must be at least 1")]
    InvalidPageLimit,

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cursor(#[from] CursorDecodeError),

    #[error(transparent)]
    FilterSet(#[from] FilterSetError),
}

impl Error {
    /// True when the error came from the database client.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

///
/// FilterSetError
///

#[derive(Debug, ThisError)]
pub enum FilterSetError {
    #[error("filter-set file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("filter-set file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}
