//! cardsynth: target-cardinality predicate synthesis and keyset pagination
//! over an externally stored document collection.
//!
//! The synthesis engine profiles a collection once, proposes candidate
//! predicates through a weighted strategy library, and counts each candidate
//! against the live store until one lands inside the tolerance window or the
//! attempt budget runs out. The paginator walks the same collection with
//! compound-key continuation cursors.

pub mod config;
pub mod cursor;
pub mod direction;
pub mod document;
pub mod error;
pub mod filterset;
pub mod paginate;
pub mod predicate;
pub mod profile;
pub mod random;
pub mod search;
pub mod store;
pub mod strategy;
pub mod synth;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Default number of synthesis attempts before the best-effort candidate is returned.
pub const DEFAULT_ATTEMPT_BUDGET: usize = 10;

/// Default tolerance above the target, as a fraction of the target.
pub const DEFAULT_MARGIN_RATIO: f64 = 0.1;

/// Default upper bound on the number of documents drawn per sample.
pub const DEFAULT_SAMPLE_SIZE: usize = 1_000;

/// Target fraction below which conjunctive refinement is eligible.
pub const CONJUNCTIVE_FRACTION_LIMIT: f64 = 0.2;

///
/// Prelude
///
/// Domain vocabulary only; errors and stores are imported explicitly.
///

pub mod prelude {
    pub use crate::{
        cursor::Cursor,
        direction::Direction,
        document::{CollectionSchema, Document},
        paginate::{KeysetPaginator, Page, SortSpec},
        predicate::Predicate,
        profile::{DistributionSnapshot, Profiler},
        synth::{SynthesisResult, Synthesizer},
        value::Value,
    };
}
