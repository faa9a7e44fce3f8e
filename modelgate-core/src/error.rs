//! Core error types for modelgate.

use thiserror::Error;

/// Core error type shared by the collaborator traits.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Provider not found or not configured.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Model not found in any catalog.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data handed to or returned by a collaborator.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backing storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Returns true if the error means a lookup came back empty.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProviderNotFound(_) | Self::ModelNotFound(_))
    }
}
