//! Error types for Synheart Store

use thiserror::Error;

/// Errors raised while turning an ingestion document into canonical records
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse ingestion document: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Record transform failed for {metric_type}: {reason}")]
    RecordTransform { metric_type: String, reason: String },

    #[error("Malformed {section} section: {reason}")]
    SectionShape { section: String, reason: String },
}

/// How a transport layer should surface a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller supplied bad input; do not retry
    ClientError,
    /// Storage is unreachable or timed out
    ServiceUnavailable,
    /// Anything else
    Internal,
}

/// Errors raised by ingestion, querying and storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Connectivity(String),

    #[error("Batch {batch} write failed: {reason}")]
    BatchWrite { batch: usize, reason: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Failed to decode stored row: {0}")]
    Decode(String),

    #[error("Failed to encode row for storage: {0}")]
    Encode(String),
}

impl StoreError {
    /// Classify the error for a request/response transport
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Validation(_) => ErrorClass::ClientError,
            StoreError::Connectivity(_) => ErrorClass::ServiceUnavailable,
            StoreError::BatchWrite { .. }
            | StoreError::Database(_)
            | StoreError::Decode(_)
            | StoreError::Encode(_) => ErrorClass::Internal,
        }
    }
}

/// Errors from the document-to-store pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// True when the sqlx error means the store could not be reached at all
pub(crate) fn is_connectivity_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_connectivity_error(&err) {
            StoreError::Connectivity(err.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}
