//! A model bound to its provider.

use modelgate_core::{ModelClient, ModelDescriptor, ModelDetails, ModelStatus};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::error::RegistryError;
use crate::provider::Provider;

/// Binds a [`ModelDescriptor`] to its [`Provider`].
///
/// The client and the status are computed on first use and then kept for
/// the lifetime of the context.
pub struct ModelContext {
    descriptor: ModelDescriptor,
    provider: Arc<Provider>,
    client: OnceCell<Arc<dyn ModelClient>>,
    status: OnceCell<ModelStatus>,
}

impl ModelContext {
    /// Creates a context.
    pub fn new(descriptor: ModelDescriptor, provider: Arc<Provider>) -> Self {
        Self {
            descriptor,
            provider,
            client: OnceCell::new(),
            status: OnceCell::new(),
        }
    }

    /// Returns the model id.
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Returns the model descriptor.
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Returns the owning provider.
    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    /// Returns the owning provider id.
    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Returns the model client, building it once.
    pub async fn client(&self) -> Result<Arc<dyn ModelClient>, RegistryError> {
        self.client
            .get_or_try_init(|| async { self.provider.create_client() })
            .await
            .cloned()
    }

    /// Returns the model status, asking the client once.
    ///
    /// A model whose client cannot be built reports `Unknown`.
    pub async fn status(&self) -> ModelStatus {
        *self
            .status
            .get_or_init(|| async {
                match self.client().await {
                    Ok(client) => client.status(self.id()).await,
                    Err(e) => {
                        warn!(model = %self.id(), error = %e, "No client for status check");
                        ModelStatus::Unknown
                    }
                }
            })
            .await
    }

    /// Returns the model details with the memoized status.
    pub async fn details(&self) -> ModelDetails {
        ModelDetails::from_descriptor(&self.descriptor, self.status().await)
    }
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("id", &self.descriptor.id)
            .field("provider", &self.provider.id())
            .finish_non_exhaustive()
    }
}
