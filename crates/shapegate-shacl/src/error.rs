use crate::report::ValidationReport;
use shapegate_store::StoreError;
use thiserror::Error;

/// Failures of schema loading, validation and the transaction gate.
#[derive(Debug, Error)]
pub enum ShaclError {
    /// The shapes graph already holds facts; schemas are write-once.
    #[error("shapes graph is already loaded; modifying loaded shapes or loading more shapes is not supported")]
    SchemaLoad,

    /// Validation was requested but no shapes were compiled.
    #[error("no shapes are loaded; load shapes or enable `ignore_no_shapes_loaded`")]
    NoShapesLoaded,

    /// The data violates one or more shapes; the report is the payload.
    #[error("validation failed: {0}")]
    ValidationFailed(Box<ValidationReport>),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Inference kept adding facts past the defensive iteration cap.
    #[error("schema inference did not reach a fixed point after {iterations} iterations")]
    InferenceDiverged { iterations: usize },

    #[error("cannot {operation} a transaction in state {state:?}")]
    InvalidTransactionState {
        state: crate::sail::TransactionState,
        operation: &'static str,
    },
}

impl ShaclError {
    /// The report carried by a validation failure.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ShaclError::ValidationFailed(report) => Some(report),
            _ => None,
        }
    }
}

pub type ShaclResult<T> = std::result::Result<T, ShaclError>;
