//! Three-tier matcher cascade.
//!
//! Tier 1: exact barcode/registration key. Tier 2: normalized
//! description mapping to exactly one canonical product. Tier 3:
//! weighted composite fuzzy score over a token-prefiltered candidate
//! pool. Batch resolution runs tiers in parallel over deduplicated
//! workloads, with an optional wall-clock budget for the whole run.

pub mod batch;
pub mod cascade;
pub mod score;
pub mod synonyms;

pub use batch::{BatchOptions, BatchOutcome, resolve_batch};
pub use cascade::{Matcher, Resolution};
pub use synonyms::SynonymSet;
