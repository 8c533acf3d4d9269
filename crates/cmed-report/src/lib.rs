//! Consolidated output, writers, triage export and run summary.
//!
//! The report layer joins match results with canonical attributes under
//! a fixed column schema, persists the resolved dataset with a sidecar
//! type manifest, and exports unresolved groups for manual triage.

pub mod error;
pub mod output;
pub mod summary;
pub mod triage;
pub mod writer;

pub use error::{ReportError, Result};
pub use output::{ColumnKind, ColumnSpec, MISSING, OutputTable, consolidate_output};
pub use summary::{SummaryInputs, build_summary};
pub use triage::{TriageGroup, triage_groups, write_triage_csv};
pub use writer::{Manifest, write_manifest, write_resolved_csv};
