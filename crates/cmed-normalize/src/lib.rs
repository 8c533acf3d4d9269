//! Rule-based text canonicalization for CMED product fields.
//!
//! This crate turns raw, inconsistently spelled product text into the
//! deterministic comparison form used as a matching key everywhere else:
//! - **rules**: immutable, versioned correction-rule tables. Rule order is
//!   part of the contract, not an implementation detail.
//! - **normalizer**: the six-stage canonicalization pipeline. Each stage is
//!   a pure function of its input and idempotent on its own output.
//!
//! The same [`Normalizer`] instance is used when building the canonical
//! registry and when preparing transaction descriptions, so both sides of
//! a join always agree on the canonical form.

pub mod normalizer;
pub mod rules;

pub use normalizer::{FieldKind, NOT_SPECIFIED, Normalizer};
pub use rules::{CorrectionRule, RuleError, RuleScope, RuleTable, RuleTableSpec, SubstringRule};
