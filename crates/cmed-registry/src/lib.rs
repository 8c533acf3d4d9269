//! Canonical registry: build, vigency consolidation, lookup indexes.
//!
//! The registry is built once per run and published immutably before any
//! matching begins. Everything the matcher needs afterwards goes through
//! the read-only [`Registry`] indexes.

pub mod build;
pub mod consolidate;
pub mod index;

pub use build::{RegistryStats, build_registry};
pub use consolidate::consolidate;
pub use index::{KeyHit, Registry, jaccard, tokenize};
