use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmedError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid product id: {0:?}")]
    InvalidProductId(String),
    #[error("registry is empty; nothing can be matched against it")]
    EmptyRegistry,
    #[error("transaction input is empty")]
    EmptyTransactions,
}

pub type Result<T> = std::result::Result<T, CmedError>;
