//! Gateway configuration.
//!
//! A single YAML or JSON document lists the providers with their models,
//! the configured default/system model ids per usage type, and the tuning
//! knobs of the caches, the orchestrator and the usage ledger.

use async_trait::async_trait;
use modelgate_core::{
    ApiFormat, CoreError, ModelAssignments, ModelDescriptor, ModelIdMap, ProviderConfig,
    ProviderConfigSource, UsageType,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{DocumentFormat, default_config_path, default_ledger_path};

/// Semantic key of the main chat model.
pub const DEFAULT_MODEL_KEY: &str = "default_model";

/// Semantic keys of the system models.
pub const SYSTEM_MODEL_KEYS: &[&str] = &["title_generator", "prompt_improver", "summarizer"];

// ============================================================================
// Settings Sections
// ============================================================================

/// Cache lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Model → provider mapping lifetime in seconds.
    #[serde(default = "default_mapping_ttl")]
    pub mapping_ttl_secs: u64,
    /// Provider config/instance lifetime in seconds.
    #[serde(default = "default_provider_ttl")]
    pub provider_ttl_secs: u64,
    /// Built catalog lifetime in seconds.
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,
}

impl CacheSettings {
    /// Returns the mapping lifetime.
    pub fn mapping_ttl(&self) -> Duration {
        Duration::from_secs(self.mapping_ttl_secs)
    }

    /// Returns the provider lifetime.
    pub fn provider_ttl(&self) -> Duration {
        Duration::from_secs(self.provider_ttl_secs)
    }

    /// Returns the catalog lifetime.
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Tool rounds before the final untooled round is forced.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

/// Usage ledger settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Where the ledger is persisted. Defaults to the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
}

impl UsageSettings {
    /// Returns the configured or default ledger path.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path.clone().unwrap_or_else(default_ledger_path)
    }
}

fn default_mapping_ttl() -> u64 {
    30 * 60
}

fn default_provider_ttl() -> u64 {
    60 * 60
}

fn default_catalog_ttl() -> u64 {
    60 * 60
}

fn default_max_tool_rounds() -> usize {
    5
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mapping_ttl_secs: default_mapping_ttl(),
            provider_ttl_secs: default_provider_ttl(),
            catalog_ttl_secs: default_catalog_ttl(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

// ============================================================================
// Provider Entry
// ============================================================================

/// One provider in the configuration file, together with its models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider record.
    #[serde(flatten)]
    pub provider: ProviderConfig,

    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Models offered by the provider.
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

impl ProviderEntry {
    /// Wraps a provider record with no models.
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            api_key_env: None,
            models: Vec::new(),
        }
    }

    /// Adds a model.
    #[must_use]
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    /// Returns the provider record with the API key filled from the
    /// environment when the file itself does not carry one.
    fn resolved_provider(&self) -> ProviderConfig {
        let mut provider = self.provider.clone();
        if provider.api_key.is_none() {
            if let Some(var) = &self.api_key_env {
                match std::env::var(var) {
                    Ok(key) => provider.api_key = Some(key),
                    Err(_) => debug!(provider = %provider.id, var = %var, "API key variable not set"),
                }
            }
        }
        provider
    }

    /// Returns the models with their owning provider id filled in.
    fn owned_models(&self) -> Vec<ModelDescriptor> {
        self.models
            .iter()
            .cloned()
            .map(|mut m| {
                if m.provider_id.is_empty() {
                    m.provider_id.clone_from(&self.provider.id);
                }
                m
            })
            .collect()
    }
}

// ============================================================================
// Gateway Config
// ============================================================================

/// The whole gateway configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Configured providers.
    pub providers: Vec<ProviderEntry>,
    /// Default model ids per usage type.
    pub default_models: HashMap<UsageType, ModelIdMap>,
    /// System model ids per usage type.
    pub system_models: HashMap<UsageType, ModelIdMap>,
    /// Cache lifetimes.
    pub cache: CacheSettings,
    /// Orchestrator settings.
    pub orchestrator: OrchestratorSettings,
    /// Usage ledger settings.
    pub usage: UsageSettings,
}

impl GatewayConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&default_config_path())
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = DocumentFormat::from_path(path).parse(&content)?;
        config.validate()?;

        info!(
            path = %path.display(),
            providers = config.providers.len(),
            "Loaded gateway configuration"
        );
        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = DocumentFormat::from_path(path).render(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved gateway configuration");
        Ok(())
    }

    /// Checks structural consistency of the document.
    ///
    /// Catalog-level rules (keys, dangling ids) are checked when catalogs
    /// are built, against live provider state.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for entry in &self.providers {
            let id = &entry.provider.id;
            if id.trim().is_empty() {
                return Err(StoreError::Config("provider with empty id".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(StoreError::Config(format!("duplicate provider id: {id}")));
            }
        }

        if self.orchestrator.max_tool_rounds == 0 {
            warn!("max_tool_rounds is 0, every tool request gets a forced final round");
        }
        Ok(())
    }

    /// Returns the configured default/system model ids.
    pub fn assignments(&self) -> ModelAssignments {
        ModelAssignments {
            default_models: self.default_models.clone(),
            system_models: self.system_models.clone(),
        }
    }

    /// Returns a starter document with one provider and every known key.
    pub fn template() -> Self {
        let provider = ProviderConfig::new("openai", ApiFormat::new("openai-api"))
            .with_name("OpenAI")
            .with_api_url("https://api.openai.com/v1/chat/completions");
        let mut entry = ProviderEntry::new(provider)
            .with_model(ModelDescriptor::new("gpt-4o", "openai").with_label("GPT-4o"))
            .with_model(
                ModelDescriptor::new("gpt-4o-mini", "openai")
                    .with_label("GPT-4o mini")
                    .with_visibility(true, true),
            );
        entry.api_key_env = Some("OPENAI_API_KEY".to_string());

        let mut defaults = ModelIdMap::new();
        defaults.insert(DEFAULT_MODEL_KEY.to_string(), Some("gpt-4o".to_string()));
        let mut external_defaults = ModelIdMap::new();
        external_defaults.insert(DEFAULT_MODEL_KEY.to_string(), Some("gpt-4o-mini".to_string()));

        let systems: ModelIdMap = SYSTEM_MODEL_KEYS
            .iter()
            .map(|key| ((*key).to_string(), Some("gpt-4o-mini".to_string())))
            .collect();

        Self {
            providers: vec![entry],
            default_models: HashMap::from([
                (UsageType::Default, defaults),
                (UsageType::ExternalApp, external_defaults),
            ]),
            system_models: HashMap::from([(UsageType::Default, systems)]),
            ..Self::default()
        }
    }
}

// ============================================================================
// File Config Source
// ============================================================================

/// A [`ProviderConfigSource`] backed by a [`GatewayConfig`].
///
/// Edits on disk become visible after [`FileConfigSource::reload`]; callers
/// should then invalidate the registry caches.
pub struct FileConfigSource {
    path: Option<PathBuf>,
    config: RwLock<Arc<GatewayConfig>>,
}

impl FileConfigSource {
    /// Wraps an in-memory configuration.
    pub fn from_config(config: GatewayConfig) -> Self {
        Self {
            path: None,
            config: RwLock::new(Arc::new(config)),
        }
    }

    /// Loads the configuration at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let config = GatewayConfig::load_from(&path)?;
        Ok(Self {
            path: Some(path),
            config: RwLock::new(Arc::new(config)),
        })
    }

    /// Returns the current configuration snapshot.
    pub async fn config(&self) -> Arc<GatewayConfig> {
        Arc::clone(&*self.config.read().await)
    }

    /// Re-reads the file. No-op for in-memory sources.
    pub async fn reload(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let config = GatewayConfig::load_from(path)?;
        *self.config.write().await = Arc::new(config);
        info!(path = %path.display(), "Reloaded gateway configuration");
        Ok(())
    }
}

#[async_trait]
impl ProviderConfigSource for FileConfigSource {
    async fn providers(&self) -> Result<Vec<ProviderConfig>, CoreError> {
        let config = self.config().await;
        Ok(config
            .providers
            .iter()
            .map(ProviderEntry::resolved_provider)
            .collect())
    }

    async fn models(&self, provider_id: &str) -> Result<Vec<ModelDescriptor>, CoreError> {
        let config = self.config().await;
        config
            .providers
            .iter()
            .find(|e| e.provider.id == provider_id)
            .map(ProviderEntry::owned_models)
            .ok_or_else(|| CoreError::ProviderNotFound(provider_id.to_string()))
    }

    async fn model_assignments(&self) -> Result<ModelAssignments, CoreError> {
        Ok(self.config().await.assignments())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r"
providers:
  - id: local
    name: Ollama
    api_format:
      unique_name: ollama-api
    api_url: http://localhost:11434/api/chat
    models:
      - id: llama3
        label: Llama 3
      - id: qwen
        active: false
default_models:
  default:
    default_model: llama3
  external_app:
    default_model: ~
cache:
  mapping_ttl_secs: 60
";

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.cache.mapping_ttl(), Duration::from_secs(1800));
        assert_eq!(config.cache.provider_ttl(), Duration::from_secs(3600));
        assert_eq!(config.orchestrator.max_tool_rounds, 5);
    }

    #[test]
    fn test_parse_yaml_with_partial_sections() {
        let config: GatewayConfig = DocumentFormat::Yaml.parse(YAML).unwrap();

        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].provider.format_name(), "ollama-api");
        assert_eq!(config.providers[0].models.len(), 2);
        assert!(config.providers[0].models[0].visible);
        assert!(!config.providers[0].models[1].active);
        assert_eq!(config.cache.mapping_ttl_secs, 60);
        assert_eq!(config.cache.provider_ttl_secs, 3600);
        assert_eq!(
            config.default_models[&UsageType::ExternalApp][DEFAULT_MODEL_KEY],
            None
        );
    }

    #[test]
    fn test_duplicate_provider_ids_rejected() {
        let entry = ProviderEntry::new(ProviderConfig::new("p", ApiFormat::new("openai-api")));
        let config = GatewayConfig {
            providers: vec![entry.clone(), entry],
            ..GatewayConfig::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = GatewayConfig::load_from(Path::new("/nonexistent/gateway.yaml")).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_template_round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");

        let template = GatewayConfig::template();
        template.save_to(&path).unwrap();
        let loaded = GatewayConfig::load_from(&path).unwrap();

        assert_eq!(loaded, template);
    }

    #[tokio::test]
    async fn test_source_fills_provider_id_on_models() {
        let config: GatewayConfig = DocumentFormat::Yaml.parse(YAML).unwrap();
        let source = FileConfigSource::from_config(config);

        let models = source.models("local").await.unwrap();
        assert!(models.iter().all(|m| m.provider_id == "local"));

        let missing = source.models("nope").await;
        assert!(matches!(missing, Err(CoreError::ProviderNotFound(_))));
    }

    #[tokio::test]
    async fn test_reload_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        GatewayConfig::default().save_to(&path).unwrap();

        let source = FileConfigSource::open(&path).unwrap();
        assert!(source.providers().await.unwrap().is_empty());

        GatewayConfig::template().save_to(&path).unwrap();
        source.reload().await.unwrap();
        assert_eq!(source.providers().await.unwrap().len(), 1);
    }
}
