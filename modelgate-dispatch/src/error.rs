//! Dispatch error types.

use modelgate_core::CoreError;
use modelgate_providers::{CatalogError, RegistryError};
use thiserror::Error;

// ============================================================================
// Dispatch Error
// ============================================================================

/// Errors raised before a request reaches a client, or by the task
/// driving a chunk stream.
///
/// Provider failures during a call are not errors here; they travel in
/// `AiResponse::error`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A raw payload carried no `model` field.
    #[error("Model id not found in request payload")]
    ModelNotInPayload,

    /// A request object was not bound to a model.
    #[error("Request is not bound to a model")]
    NoModelBound,

    /// The raw payload could not be parsed.
    #[error("Invalid request payload: {0}")]
    InvalidPayload(#[from] CoreError),

    /// The model could not be resolved through the catalog.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The model's client could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The task driving a chunk stream panicked or was cancelled.
    #[error("Chunk stream aborted: {0}")]
    StreamAborted(String),
}

impl DispatchError {
    /// Returns true if the request named no model or an unknown one.
    pub fn is_unresolved_model(&self) -> bool {
        matches!(
            self,
            Self::ModelNotInPayload
                | Self::NoModelBound
                | Self::Catalog(CatalogError::ModelNotAvailable(_))
        )
    }
}

// ============================================================================
// Tool Error
// ============================================================================

/// Errors a tool handler may return.
///
/// These never abort a request; they become error results the model sees.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The arguments did not fit the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}
