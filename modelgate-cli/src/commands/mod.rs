//! CLI command implementations.

pub mod adapters;
pub mod init;
pub mod models;
pub mod resolve;
pub mod send;
pub mod usage;

use anyhow::{Context, Result};
use modelgate_providers::{ModelCatalog, ProviderRegistry};
use modelgate_store::{FileConfigSource, GatewayConfig, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Cli;

/// The configured gateway, opened from the CLI's config path.
pub struct Gateway {
    /// Configuration snapshot.
    pub config: Arc<GatewayConfig>,
    /// Catalog service over the provider registry.
    pub catalog: Arc<ModelCatalog>,
}

impl Gateway {
    /// Opens the configuration and wires registry and catalog.
    ///
    /// The model mapping is loaded eagerly so adapter problems are reported
    /// before any command runs.
    pub async fn open(cli: &Cli) -> Result<Self> {
        let path = config_path(cli);
        debug!(path = %path.display(), "Opening gateway configuration");

        let source = Arc::new(
            FileConfigSource::open(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
        );
        let config = source.config().await;

        let registry = ProviderRegistry::with_builtin_adapters(source, &config.cache);
        let mappings = registry
            .load_mappings()
            .await
            .context("failed to load provider mappings")?;
        let rejected = registry.rejected_providers().await;
        if !rejected.is_empty() {
            warn!(providers = ?rejected, "Providers without a usable adapter, see `modelgate adapters`");
        }
        debug!(models = mappings.len(), "Loaded model mappings");

        let catalog = ModelCatalog::new(Arc::new(registry), &config.cache);

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
        })
    }

    /// Returns the provider registry.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        self.catalog.registry()
    }
}

/// Returns the config path given on the command line, or the default one.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_config_path)
}
