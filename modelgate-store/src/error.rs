//! Store error types.

use modelgate_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("Usage record not found: {0}")]
    RecordNotFound(u64),

    /// Record was never persisted.
    #[error("Usage record has no id")]
    MissingRecordId,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Collaborator error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Core(CoreError::Storage(_)))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(inner) => inner,
            StoreError::Config(msg) => CoreError::InvalidConfig(msg),
            other => CoreError::Storage(other.to_string()),
        }
    }
}
