//! Registry and catalog error types.

use modelgate_core::{CoreError, UsageType};
use std::fmt;
use thiserror::Error;

use crate::adapter::AdapterKind;

// ============================================================================
// Registry Error
// ============================================================================

/// Errors raised while resolving models and providers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No active provider offers the model.
    #[error("Unknown model ID: {0}")]
    UnknownModel(String),

    /// The provider is missing or inactive.
    #[error("Provider not found or not active: {0}")]
    ProviderNotFound(String),

    /// Not even the fallback adapter is registered.
    #[error("No usable adapter for provider {0}")]
    NoUsableAdapter(String),

    /// The adapter refused the provider configuration.
    #[error("Adapter {kind} could not build a client for {provider}: {reason}")]
    ClientConstruction {
        /// Adapter that failed.
        kind: AdapterKind,
        /// Provider id.
        provider: String,
        /// Why it failed.
        reason: String,
    },

    /// The configuration source failed.
    #[error("Configuration source error: {0}")]
    Source(#[from] CoreError),
}

impl RegistryError {
    /// Returns true if the error means a lookup came back empty.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownModel(_) | Self::ProviderNotFound(_))
    }
}

// ============================================================================
// Catalog Error
// ============================================================================

/// A configured key whose model id matched no active model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingModel {
    /// Semantic key, e.g. `title_generator`.
    pub key: String,
    /// Configured model id. `None` if the key was left unset.
    pub model_id: Option<String>,
}

impl fmt::Display for MissingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model_id {
            Some(id) => write!(f, "{}={}", self.key, id),
            None => write!(f, "{}=<unset>", self.key),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while building or querying a catalog.
///
/// The first four variants mean the configuration is broken; no partial
/// catalog is ever served.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A usage type configures keys the `default` usage type does not have.
    #[error("{usage_type} {map} models use keys unknown to the default usage type: {}", .keys.join(", "))]
    InconsistentUsageTypeKeys {
        /// Offending usage type.
        usage_type: UsageType,
        /// `"default"` or `"system"`.
        map: &'static str,
        /// Keys missing from the default usage type.
        keys: Vec<String>,
    },

    /// Configured default models that match no active model.
    #[error("Missing default models for {usage_type}: {}", join(.missing))]
    MissingDefaultModels {
        /// Usage type being built.
        usage_type: UsageType,
        /// Unmatched keys.
        missing: Vec<MissingModel>,
    },

    /// Configured system models that match no active model.
    #[error("Missing system models for {usage_type}: {}", join(.missing))]
    MissingSystemModels {
        /// Usage type being built.
        usage_type: UsageType,
        /// Unmatched keys.
        missing: Vec<MissingModel>,
    },

    /// A configured model id is offered by more than one active provider.
    #[error("Model {model_id} for key {key} is offered by several providers: {}", .providers.join(", "))]
    AmbiguousModel {
        /// Semantic key.
        key: String,
        /// Model id.
        model_id: String,
        /// Providers offering it.
        providers: Vec<String>,
    },

    /// The model is not in the catalog.
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CatalogError {
    /// Returns true if the configuration itself is inconsistent.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InconsistentUsageTypeKeys { .. }
                | Self::MissingDefaultModels { .. }
                | Self::MissingSystemModels { .. }
                | Self::AmbiguousModel { .. }
        )
    }
}

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ModelNotAvailable(id) => CoreError::ModelNotFound(id),
            CatalogError::Registry(RegistryError::UnknownModel(id)) => CoreError::ModelNotFound(id),
            CatalogError::Registry(RegistryError::ProviderNotFound(id)) => {
                CoreError::ProviderNotFound(id)
            }
            CatalogError::Registry(RegistryError::Source(inner)) => inner,
            other if other.is_configuration_error() => CoreError::InvalidConfig(other.to_string()),
            other => CoreError::Other(other.to_string()),
        }
    }
}
