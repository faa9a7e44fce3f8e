//! Provider registry.
//!
//! Maps model ids to providers and providers to ready [`Provider`]
//! instances. Three caches sit in front of the configuration source:
//!
//! - model id to provider id (mapping TTL)
//! - provider id to active provider configuration (provider TTL)
//! - provider id to resolved provider instance (provider TTL)
//!
//! Every cached value is re-derivable from the source, so concurrent
//! rebuilds are harmless. Edits to the source must be followed by
//! [`ProviderRegistry::refresh_mappings`] or
//! [`ProviderRegistry::clear_all_caches`].

use modelgate_core::{ModelAssignments, ModelDescriptor, ProviderConfig, ProviderConfigSource};
use modelgate_store::{CacheSettings, TtlCache};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::RegistryError;
use crate::provider::Provider;
use crate::resolution::{AdapterResolution, AdapterResolver};
use crate::table::AdapterTable;

/// Model id to provider id.
pub type ModelMappings = HashMap<String, String>;

// ============================================================================
// Provider Registry
// ============================================================================

/// Resolves model ids to providers, with cached lookups.
pub struct ProviderRegistry {
    source: Arc<dyn ProviderConfigSource>,
    resolver: AdapterResolver,
    mappings: TtlCache<(), Arc<ModelMappings>>,
    configs: TtlCache<String, ProviderConfig>,
    instances: TtlCache<String, Arc<Provider>>,
    rejected: RwLock<Vec<String>>,
}

impl ProviderRegistry {
    /// Creates a registry over a configuration source.
    pub fn new(
        source: Arc<dyn ProviderConfigSource>,
        table: AdapterTable,
        cache: &CacheSettings,
    ) -> Self {
        Self {
            source,
            resolver: AdapterResolver::new(table),
            mappings: TtlCache::new("model_mappings", cache.mapping_ttl()),
            configs: TtlCache::new("provider_configs", cache.provider_ttl()),
            instances: TtlCache::new("provider_instances", cache.provider_ttl()),
            rejected: RwLock::new(Vec::new()),
        }
    }

    /// Creates a registry with the built-in adapter table.
    pub fn with_builtin_adapters(
        source: Arc<dyn ProviderConfigSource>,
        cache: &CacheSettings,
    ) -> Self {
        Self::new(source, AdapterTable::builtin(), cache)
    }

    /// Returns the adapter resolver.
    pub fn resolver(&self) -> &AdapterResolver {
        &self.resolver
    }

    // ========================================================================
    // Mappings
    // ========================================================================

    /// Returns the model id to provider id map.
    ///
    /// An empty cached map is treated as a miss and rebuilt. Every rebuild
    /// reads the configuration and checks the adapter of each active
    /// provider.
    pub async fn load_mappings(&self) -> Result<Arc<ModelMappings>, RegistryError> {
        if let Some(mappings) = self.mappings.get(&()).await {
            if !mappings.is_empty() {
                return Ok(mappings);
            }
            debug!("Cached model mapping is empty, rebuilding");
        }

        let mappings = Arc::new(self.build_mappings().await?);
        self.mappings.insert((), Arc::clone(&mappings)).await;
        Ok(mappings)
    }

    async fn build_mappings(&self) -> Result<ModelMappings, RegistryError> {
        let mut mappings = ModelMappings::new();
        let providers: Vec<ProviderConfig> = self
            .source
            .providers()
            .await?
            .into_iter()
            .filter(|p| p.active)
            .collect();

        let rejected: Vec<String> = self
            .check_adapters(&providers)
            .into_iter()
            .filter(|r| !r.is_success())
            .map(|r| r.provider_id)
            .collect();
        *self.rejected.write().await = rejected;

        for provider in providers {
            for model in self.source.models(&provider.id).await? {
                if !model.active {
                    continue;
                }
                match mappings.get(&model.id) {
                    Some(owner) => warn!(
                        model = %model.id,
                        kept = %owner,
                        ignored = %provider.id,
                        "Model offered by several providers, keeping the first"
                    ),
                    None => {
                        mappings.insert(model.id, provider.id.clone());
                    }
                }
            }
        }

        info!(models = mappings.len(), "Built model mapping");
        Ok(mappings)
    }

    /// Returns the id of the provider that serves `model_id`.
    #[instrument(skip(self))]
    pub async fn provider_for_model(&self, model_id: &str) -> Result<String, RegistryError> {
        self.load_mappings()
            .await?
            .get(model_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownModel(model_id.to_string()))
    }

    /// Drops the model mapping and rebuilds it.
    pub async fn refresh_mappings(&self) -> Result<usize, RegistryError> {
        self.mappings.invalidate(&()).await;
        let count = self.load_mappings().await?.len();
        info!(models = count, "Refreshed model mapping");
        Ok(count)
    }

    // ========================================================================
    // Providers
    // ========================================================================

    /// Returns the configuration of an active provider.
    pub async fn provider_config(&self, provider_id: &str) -> Result<ProviderConfig, RegistryError> {
        self.configs
            .get_or_try_build(provider_id.to_string(), || async {
                self.source
                    .provider(provider_id)
                    .await?
                    .filter(|p| p.active)
                    .ok_or_else(|| RegistryError::ProviderNotFound(provider_id.to_string()))
            })
            .await
    }

    /// Returns the memoized provider instance for an id.
    ///
    /// On a miss the configuration is loaded, the adapter resolved and the
    /// instance cached.
    #[instrument(skip(self))]
    pub async fn provider_by_id(&self, provider_id: &str) -> Result<Arc<Provider>, RegistryError> {
        self.instances
            .get_or_try_build(provider_id.to_string(), || async {
                let config = self.provider_config(provider_id).await?;
                let kind = self.resolver.resolve(&config).result?;
                let constructor = self
                    .resolver
                    .table()
                    .constructor(kind)
                    .ok_or_else(|| RegistryError::NoUsableAdapter(provider_id.to_string()))?;

                debug!(adapter = %kind, "Provider instance created");
                Ok(Arc::new(Provider::new(config, kind, constructor)))
            })
            .await
    }

    /// Returns the provider instance that serves `model_id`.
    pub async fn provider_for_model_instance(
        &self,
        model_id: &str,
    ) -> Result<Arc<Provider>, RegistryError> {
        let provider_id = self.provider_for_model(model_id).await?;
        self.provider_by_id(&provider_id).await
    }

    /// Looks a provider up by API format key, then by display name.
    ///
    /// Kept for records that reference providers by format instead of id.
    pub async fn provider_by_format(&self, name: &str) -> Result<Arc<Provider>, RegistryError> {
        let providers = self.source.providers().await?;
        let active = || providers.iter().filter(|p| p.active);

        let found = active()
            .find(|p| p.api_format.as_ref().is_some_and(|f| f.unique_name == name))
            .or_else(|| active().find(|p| p.name == name));

        match found {
            Some(config) => self.provider_by_id(&config.id).await,
            None => Err(RegistryError::ProviderNotFound(name.to_string())),
        }
    }

    /// Returns every active provider with a usable adapter.
    ///
    /// Providers whose adapter cannot be resolved are skipped with a warning.
    pub async fn active_providers(&self) -> Result<Vec<Arc<Provider>>, RegistryError> {
        let mut providers = Vec::new();
        for config in self.source.providers().await?.into_iter().filter(|p| p.active) {
            match self.provider_by_id(&config.id).await {
                Ok(provider) => providers.push(provider),
                Err(e @ RegistryError::Source(_)) => return Err(e),
                Err(e) => warn!(provider = %config.id, error = %e, "Skipping provider"),
            }
        }
        Ok(providers)
    }

    /// Returns the raw models of a provider.
    pub async fn models_for(&self, provider_id: &str) -> Result<Vec<ModelDescriptor>, RegistryError> {
        Ok(self.source.models(provider_id).await?)
    }

    /// Returns the configured default/system model ids.
    pub async fn model_assignments(&self) -> Result<ModelAssignments, RegistryError> {
        Ok(self.source.model_assignments().await?)
    }

    /// Resolves the adapter of every active provider without caching.
    pub async fn validate_adapters(&self) -> Result<Vec<AdapterResolution>, RegistryError> {
        let providers: Vec<ProviderConfig> = self
            .source
            .providers()
            .await?
            .into_iter()
            .filter(|p| p.active)
            .collect();
        Ok(self.check_adapters(&providers))
    }

    /// Returns the providers whose adapter failed the last mapping rebuild.
    pub async fn rejected_providers(&self) -> Vec<String> {
        self.rejected.read().await.clone()
    }

    fn check_adapters(&self, providers: &[ProviderConfig]) -> Vec<AdapterResolution> {
        let reports: Vec<_> = providers
            .iter()
            .map(|config| self.resolver.resolve(config))
            .collect();

        for report in reports.iter().filter(|r| !r.is_success()) {
            warn!(provider = %report.provider_id, "Provider has no usable adapter");
        }
        let failed = reports.iter().filter(|r| !r.is_success()).count();
        let fallback = reports.iter().filter(|r| r.used_fallback()).count();
        info!(providers = reports.len(), failed, fallback, "Validated adapters");
        reports
    }

    /// Drops every cached mapping, configuration and instance.
    pub async fn clear_all_caches(&self) {
        self.mappings.clear().await;
        self.configs.clear().await;
        self.instances.clear().await;
        info!("Cleared registry caches");
    }
}

// ============================================================================
// Tests
// ============================================================================
