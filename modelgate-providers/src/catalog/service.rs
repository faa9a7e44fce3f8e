//! Cached catalogs per usage type.

use async_trait::async_trait;
use modelgate_core::{CoreError, ModelProviderLookup, UsageType};
use modelgate_store::{CacheSettings, TtlCache};
use std::sync::Arc;
use tracing::{info, instrument};

use super::builder::AvailableModelsBuilder;
use super::context::ModelContext;
use super::AvailableModelCatalog;
use crate::error::CatalogError;
use crate::registry::ProviderRegistry;

/// Builds catalogs from the registry and caches them per usage type.
pub struct ModelCatalog {
    registry: Arc<ProviderRegistry>,
    catalogs: TtlCache<UsageType, Arc<AvailableModelCatalog>>,
}

impl ModelCatalog {
    /// Creates a catalog service over a registry.
    pub fn new(registry: Arc<ProviderRegistry>, cache: &CacheSettings) -> Self {
        Self {
            registry,
            catalogs: TtlCache::new("model_catalogs", cache.catalog_ttl()),
        }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Returns the catalog of a usage type, building it on a miss.
    #[instrument(skip(self))]
    pub async fn catalog(
        &self,
        usage_type: UsageType,
    ) -> Result<Arc<AvailableModelCatalog>, CatalogError> {
        self.catalogs
            .get_or_try_build(usage_type, || async {
                let catalog = self.build(usage_type).await?;
                Ok(Arc::new(catalog))
            })
            .await
    }

    async fn build(&self, usage_type: UsageType) -> Result<AvailableModelCatalog, CatalogError> {
        let assignments = self.registry.model_assignments().await?;
        let mut builder = AvailableModelsBuilder::new(assignments);

        for provider in self.registry.active_providers().await? {
            let models = self.registry.models_for(provider.id()).await?;
            builder.add_models(
                models
                    .into_iter()
                    .map(|descriptor| Arc::new(ModelContext::new(descriptor, Arc::clone(&provider)))),
            );
        }

        builder.build(usage_type)
    }

    /// Returns a visible model of a usage type.
    pub async fn model(
        &self,
        model_id: &str,
        usage_type: UsageType,
    ) -> Result<Option<Arc<ModelContext>>, CatalogError> {
        Ok(self.catalog(usage_type).await?.model(model_id).cloned())
    }

    /// Returns a visible model of a usage type or fails.
    pub async fn model_or_fail(
        &self,
        model_id: &str,
        usage_type: UsageType,
    ) -> Result<Arc<ModelContext>, CatalogError> {
        self.model(model_id, usage_type)
            .await?
            .ok_or_else(|| CatalogError::ModelNotAvailable(model_id.to_string()))
    }

    /// Drops the cached catalogs.
    pub async fn clear(&self) {
        self.catalogs.clear().await;
    }

    /// Drops the cached catalogs and every registry cache.
    pub async fn clear_all_caches(&self) {
        self.clear().await;
        self.registry.clear_all_caches().await;
        info!("Cleared catalog caches");
    }
}

/// Resolves through the default catalog first. Models that catalog does not
/// show (hidden, or visible to other usage types only) fall back to the
/// registry mapping, so their usage is still attributed to the owning
/// provider instead of the unknown placeholder.
#[async_trait]
impl ModelProviderLookup for ModelCatalog {
    async fn provider_for_model(&self, model_id: &str) -> Result<String, CoreError> {
        if let Some(model) = self.model(model_id, UsageType::Default).await? {
            return Ok(model.provider_id().to_string());
        }
        let provider = self
            .registry
            .provider_for_model(model_id)
            .await
            .map_err(CatalogError::from)?;
        Ok(provider)
    }
}
