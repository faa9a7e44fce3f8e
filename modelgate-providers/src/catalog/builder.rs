//! Catalog construction.
//!
//! The builder is pure: it takes the configured assignments and the model
//! contexts of every active provider and either produces a complete
//! catalog or fails. It never returns a partial catalog.

use modelgate_core::{ModelAssignments, ModelIdMap, UsageType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::context::ModelContext;
use super::AvailableModelCatalog;
use crate::error::{CatalogError, MissingModel};

/// Builds [`AvailableModelCatalog`]s from assignments and model contexts.
#[derive(Debug, Clone, Default)]
pub struct AvailableModelsBuilder {
    assignments: ModelAssignments,
    models: Vec<Arc<ModelContext>>,
}

impl AvailableModelsBuilder {
    /// Creates a builder over configured assignments.
    pub fn new(assignments: ModelAssignments) -> Self {
        Self {
            assignments,
            models: Vec::new(),
        }
    }

    /// Adds one model. Order is kept in the built catalog.
    #[must_use]
    pub fn with_model(mut self, model: Arc<ModelContext>) -> Self {
        self.models.push(model);
        self
    }

    /// Adds several models.
    pub fn add_models(&mut self, models: impl IntoIterator<Item = Arc<ModelContext>>) {
        self.models.extend(models);
    }

    /// Builds the catalog of one usage type.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InconsistentUsageTypeKeys`] if any usage type uses
    ///   keys the `default` usage type does not declare
    /// - [`CatalogError::AmbiguousModel`] if a configured id matches more
    ///   than one active model
    /// - [`CatalogError::MissingDefaultModels`] /
    ///   [`CatalogError::MissingSystemModels`] if configured ids match no
    ///   active model
    #[instrument(skip(self), fields(models = self.models.len()))]
    pub fn build(&self, usage_type: UsageType) -> Result<AvailableModelCatalog, CatalogError> {
        validate_keys(&self.assignments.default_models, "default")?;
        validate_keys(&self.assignments.system_models, "system")?;

        let default_ids = effective_map(&self.assignments.default_models, usage_type);
        let system_ids = effective_map(&self.assignments.system_models, usage_type);

        let mut defaults: BTreeMap<String, Arc<ModelContext>> = BTreeMap::new();
        let mut system: BTreeMap<String, Arc<ModelContext>> = BTreeMap::new();
        let mut visible = Vec::new();

        for model in self.models.iter().filter(|m| m.descriptor().active) {
            let matched_default = assign_matches(&default_ids, model, &mut defaults)?;
            let matched_system = assign_matches(&system_ids, model, &mut system)?;

            if matched_default || matched_system || model.descriptor().is_visible_for(usage_type) {
                visible.push(Arc::clone(model));
            }
        }

        let missing_defaults: Vec<MissingModel> = default_ids
            .iter()
            .filter(|(key, id)| id.is_some() && !defaults.contains_key(*key))
            .map(|(key, id)| MissingModel {
                key: key.clone(),
                model_id: id.clone(),
            })
            .collect();
        if !missing_defaults.is_empty() {
            return Err(CatalogError::MissingDefaultModels {
                usage_type,
                missing: missing_defaults,
            });
        }

        let missing_system: Vec<MissingModel> = system_ids
            .iter()
            .filter(|(key, _)| !system.contains_key(*key))
            .map(|(key, id)| MissingModel {
                key: key.clone(),
                model_id: id.clone(),
            })
            .collect();
        if !missing_system.is_empty() {
            return Err(CatalogError::MissingSystemModels {
                usage_type,
                missing: missing_system,
            });
        }

        debug!(
            usage_type = %usage_type,
            visible = visible.len(),
            defaults = defaults.len(),
            system = system.len(),
            "Built model catalog"
        );
        Ok(AvailableModelCatalog::new(usage_type, visible, defaults, system))
    }
}

/// Checks that every usage type only uses keys of the `default` usage type.
fn validate_keys(
    maps: &HashMap<UsageType, ModelIdMap>,
    map: &'static str,
) -> Result<(), CatalogError> {
    let empty = ModelIdMap::new();
    let reference = maps.get(&UsageType::Default).unwrap_or(&empty);

    for usage_type in UsageType::all() {
        if *usage_type == UsageType::Default {
            continue;
        }
        let Some(ids) = maps.get(usage_type) else {
            continue;
        };
        let unknown: Vec<String> = ids
            .keys()
            .filter(|key| !reference.contains_key(*key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(CatalogError::InconsistentUsageTypeKeys {
                usage_type: *usage_type,
                map,
                keys: unknown,
            });
        }
    }
    Ok(())
}

/// `default` entries overridden by the usage type's non-null entries.
fn effective_map(maps: &HashMap<UsageType, ModelIdMap>, usage_type: UsageType) -> ModelIdMap {
    let mut effective = maps.get(&UsageType::Default).cloned().unwrap_or_default();
    if usage_type != UsageType::Default {
        if let Some(specific) = maps.get(&usage_type) {
            for (key, id) in specific {
                if id.is_some() {
                    effective.insert(key.clone(), id.clone());
                }
            }
        }
    }
    effective
}

/// Records `model` under every key whose id it matches exactly.
///
/// Returns whether anything matched.
fn assign_matches(
    ids: &ModelIdMap,
    model: &Arc<ModelContext>,
    assigned: &mut BTreeMap<String, Arc<ModelContext>>,
) -> Result<bool, CatalogError> {
    let mut matched = false;
    for (key, id) in ids {
        if id.as_deref() != Some(model.id()) {
            continue;
        }
        if let Some(existing) = assigned.get(key) {
            return Err(CatalogError::AmbiguousModel {
                key: key.clone(),
                model_id: model.id().to_string(),
                providers: vec![
                    existing.provider_id().to_string(),
                    model.provider_id().to_string(),
                ],
            });
        }
        assigned.insert(key.clone(), Arc::clone(model));
        matched = true;
    }
    Ok(matched)
}
