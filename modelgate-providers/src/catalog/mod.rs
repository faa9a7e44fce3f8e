//! Model catalogs.
//!
//! A catalog is the validated, request-ready view of one usage type: the
//! visible models plus the models behind each default and system key.
//!
//! - [`ModelContext`] - A model bound to its provider
//! - [`AvailableModelsBuilder`] - Builds and validates catalogs
//! - [`ModelCatalog`] - Cached catalogs per usage type

mod builder;
mod context;
mod service;


pub use builder::AvailableModelsBuilder;
pub use context::ModelContext;
pub use service::ModelCatalog;

use modelgate_core::UsageType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Available Model Catalog
// ============================================================================

/// The built catalog of one usage type.
#[derive(Debug, Clone)]
pub struct AvailableModelCatalog {
    usage_type: UsageType,
    models: Vec<Arc<ModelContext>>,
    defaults: BTreeMap<String, Arc<ModelContext>>,
    system: BTreeMap<String, Arc<ModelContext>>,
}

impl AvailableModelCatalog {
    pub(crate) fn new(
        usage_type: UsageType,
        models: Vec<Arc<ModelContext>>,
        defaults: BTreeMap<String, Arc<ModelContext>>,
        system: BTreeMap<String, Arc<ModelContext>>,
    ) -> Self {
        Self {
            usage_type,
            models,
            defaults,
            system,
        }
    }

    /// Returns the usage type.
    pub fn usage_type(&self) -> UsageType {
        self.usage_type
    }

    /// Returns the visible models in provider order.
    pub fn models(&self) -> &[Arc<ModelContext>] {
        &self.models
    }

    /// Returns a visible model by exact id.
    pub fn model(&self, model_id: &str) -> Option<&Arc<ModelContext>> {
        self.models.iter().find(|m| m.id() == model_id)
    }

    /// Returns the default models by key.
    pub fn defaults(&self) -> &BTreeMap<String, Arc<ModelContext>> {
        &self.defaults
    }

    /// Returns the system models by key.
    pub fn system(&self) -> &BTreeMap<String, Arc<ModelContext>> {
        &self.system
    }

    /// Returns the default model of a key.
    pub fn default_model(&self, key: &str) -> Option<&Arc<ModelContext>> {
        self.defaults.get(key)
    }

    /// Returns the system model of a key.
    pub fn system_model(&self, key: &str) -> Option<&Arc<ModelContext>> {
        self.system.get(key)
    }

    /// Returns an id-only view, for output and comparison.
    pub fn summary(&self) -> CatalogSummary {
        let ids = |map: &BTreeMap<String, Arc<ModelContext>>| {
            map.iter()
                .map(|(key, model)| (key.clone(), model.id().to_string()))
                .collect()
        };

        CatalogSummary {
            usage_type: self.usage_type,
            models: self
                .models
                .iter()
                .map(|m| CatalogEntry {
                    id: m.id().to_string(),
                    label: m.descriptor().display_label().to_string(),
                    provider: m.provider_id().to_string(),
                })
                .collect(),
            defaults: ids(&self.defaults),
            system: ids(&self.system),
        }
    }
}

/// One visible model in a [`CatalogSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Model id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Owning provider id.
    pub provider: String,
}

/// Ids of everything in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    /// Usage type.
    pub usage_type: UsageType,
    /// Visible models.
    pub models: Vec<CatalogEntry>,
    /// Default model id per key.
    pub defaults: BTreeMap<String, String>,
    /// System model id per key.
    pub system: BTreeMap<String, String>,
}
