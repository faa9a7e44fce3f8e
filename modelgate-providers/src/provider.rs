//! A resolved provider: configuration plus adapter.

use modelgate_core::{ModelClient, ProviderConfig};
use std::fmt;
use std::sync::Arc;

use crate::adapter::AdapterKind;
use crate::error::RegistryError;
use crate::table::ClientConstructor;

/// A provider whose adapter has been decided.
///
/// Instances are memoized by the registry; building a client is left to
/// the caller so each model context can own one.
#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
    adapter: AdapterKind,
    constructor: ClientConstructor,
}

impl Provider {
    /// Creates a provider from its configuration and resolved adapter.
    pub fn new(config: ProviderConfig, adapter: AdapterKind, constructor: ClientConstructor) -> Self {
        Self {
            config,
            adapter,
            constructor,
        }
    }

    /// Returns the provider id.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the resolved adapter.
    pub fn adapter(&self) -> AdapterKind {
        self.adapter
    }

    /// Builds a client through the adapter.
    pub fn create_client(&self) -> Result<Arc<dyn ModelClient>, RegistryError> {
        (self.constructor)(&self.config)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.config.id)
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}
