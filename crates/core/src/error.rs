//! Error types for semsearch.
//!
//! One enum covers every failure class in the workspace. The variants are
//! grouped by how callers are expected to react: initialization and
//! provisioning failures abort a run, per-document and per-batch failures are
//! counted and skipped, and query-time failures are reported back to the
//! caller without crashing it.

use thiserror::Error;

/// Unified error type for semsearch.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The embedding model could not be loaded or reached at startup
    #[error("Model initialization error: {0}")]
    ModelInit(String),

    /// A single embedding call failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The embedding server could not be reached or is overloaded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The store could not be reached (connection refused, DNS, 503)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A store or model request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The target index does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The index schema disagrees with the embedding configuration
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The store answered but rejected the request
    #[error("Store error: {0}")]
    Store(String),

    /// A corpus record could not be decoded
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Timeout(_) | AppError::StoreUnavailable(_) | AppError::ModelUnavailable(_)
        )
    }

    /// Whether a bulk write failure must abort the ingestion run.
    ///
    /// An unreachable store or a vanished index cannot be recovered by moving
    /// on to the next batch. Anything else the store rejected only costs the
    /// documents of that batch.
    pub fn is_fatal_for_ingest(&self) -> bool {
        matches!(
            self,
            AppError::StoreUnavailable(_) | AppError::Timeout(_) | AppError::IndexNotFound(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
