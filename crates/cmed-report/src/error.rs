use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("manifest serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("match results and transactions are misaligned: {results} results for {transactions} transactions")]
    Misaligned {
        results: usize,
        transactions: usize,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
