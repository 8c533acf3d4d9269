//! CSV ingestion of registry and transaction rows.
//!
//! Reads UTF-8, header-bearing CSV into typed records. Malformed rows
//! (wrong column count, unparseable numbers or dates) are skipped and
//! counted, never fatal; the counts surface in the run summary so
//! operators can judge input quality.

pub mod error;
pub mod registry_csv;
pub mod transaction_csv;

mod parse;

pub use error::{IngestError, Result};
pub use registry_csv::{RegistryRowRaw, read_registry_csv};
pub use transaction_csv::{TransactionCsvOptions, read_transaction_csv};

/// Counters produced by one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data rows read, including skipped ones.
    pub rows_read: usize,
    /// Rows dropped for structural or parse errors.
    pub malformed_skipped: usize,
}
