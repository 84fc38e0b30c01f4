use thiserror::Error;

/// Failures raised by stores, connections and the pattern query engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no active transaction")]
    NoActiveTransaction,

    #[error("a transaction is already active on this connection")]
    TransactionAlreadyActive,

    #[error("transaction conflict: store moved from version {expected} to {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("query error: {message}")]
    Query { message: String },

    #[error("invalid term: {0}")]
    InvalidTerm(String),
}

impl StoreError {
    pub(crate) fn query(message: impl Into<String>) -> Self {
        StoreError::Query {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
