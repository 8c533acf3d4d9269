//! Core data model for CMED product entity resolution.
//!
//! Defines the vocabulary shared by every pipeline stage:
//! - identifiers ([`ProductId`], [`Barcode`], [`RegistrationNumber`], [`TransactionId`])
//! - the canonical registry entry ([`CanonicalProduct`], [`ValidityInterval`])
//! - the immutable transaction input ([`TransactionRecord`])
//! - matcher output ([`MatchResult`], [`MatchTier`])
//! - configuration ([`MatchOptions`], [`ConsolidateOptions`]) and the run
//!   summary reported to operators ([`RunSummary`]).

pub mod error;
pub mod ids;
pub mod matching;
pub mod options;
pub mod product;
pub mod summary;
pub mod transaction;

pub use error::{CmedError, Result};
pub use ids::{Barcode, ProductId, RegistrationNumber, TransactionId};
pub use matching::{MatchResult, MatchTier, MatchedVia, ScoredCandidate};
pub use options::{ConsolidateOptions, MatchOptions, MatchWeights};
pub use product::{AttributeSnapshot, CanonicalProduct, ValidityInterval};
pub use summary::RunSummary;
pub use transaction::TransactionRecord;
