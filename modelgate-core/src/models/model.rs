//! Model descriptors and usage partitions.
//!
//! - [`UsageType`] - Partition between internal and external-app traffic
//! - [`ModelDescriptor`] - One addressable model offered by a provider
//! - [`ModelAssignments`] - Configured default/system model ids
//! - [`ModelStatus`] / [`ModelDetails`] - What a client reports about a model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

fn default_true() -> bool {
    true
}

// ============================================================================
// Usage Type
// ============================================================================

/// Partitions which default/system mapping and which visibility flag apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    /// Internal chat traffic.
    Default,
    /// Traffic on behalf of external applications.
    ExternalApp,
}

impl UsageType {
    /// Returns all usage types, `Default` first.
    pub fn all() -> &'static [UsageType] {
        &[Self::Default, Self::ExternalApp]
    }

    /// Returns the configuration key for this usage type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ExternalApp => "external_app",
        }
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Model Descriptor
// ============================================================================

/// Raw capability metadata of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Accepted input modalities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<String>,

    /// Produced output modalities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,

    /// Anything else the provider reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool strategy that marks a tool as switched off.
pub const TOOL_UNSUPPORTED: &str = "unsupported";

impl ModelCapabilities {
    /// Returns true if the raw `tools` map enables `tool`.
    ///
    /// Entries are either booleans or strategy names; every strategy other
    /// than [`TOOL_UNSUPPORTED`] counts as enabled.
    pub fn has_tool(&self, tool: &str) -> bool {
        match self.extra.get("tools").and_then(|tools| tools.get(tool)) {
            Some(Value::Bool(enabled)) => *enabled,
            Some(Value::String(strategy)) => strategy != TOOL_UNSUPPORTED,
            _ => false,
        }
    }
}

/// One addressable model, owned by exactly one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model id as the provider knows it.
    pub id: String,

    /// Preferred display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Provider-side model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the model may be used. Absent means active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Visible for [`UsageType::Default`].
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Visible for [`UsageType::ExternalApp`].
    #[serde(default)]
    pub visible_external: bool,

    /// Raw capability metadata.
    #[serde(default)]
    pub capabilities: ModelCapabilities,

    /// Id of the owning provider.
    #[serde(default)]
    pub provider_id: String,
}

impl ModelDescriptor {
    /// Creates an active, default-visible model.
    pub fn new(id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            name: None,
            active: true,
            visible: true,
            visible_external: false,
            capabilities: ModelCapabilities::default(),
            provider_id: provider_id.into(),
        }
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets both visibility flags.
    #[must_use]
    pub fn with_visibility(mut self, visible: bool, visible_external: bool) -> Self {
        self.visible = visible;
        self.visible_external = visible_external;
        self
    }

    /// Marks the model as inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the display label, falling back to the name and then the id.
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }

    /// Returns true if the model declares itself visible for the usage type.
    pub fn is_visible_for(&self, usage_type: UsageType) -> bool {
        match usage_type {
            UsageType::Default => self.visible,
            UsageType::ExternalApp => self.visible_external,
        }
    }
}

// ============================================================================
// Model Assignments
// ============================================================================

/// Semantic key to configured model id. `None` means "not configured".
pub type ModelIdMap = BTreeMap<String, Option<String>>;

/// Configured default and system model ids, per usage type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAssignments {
    /// Default models, e.g. `default_model → gpt-4o`.
    pub default_models: HashMap<UsageType, ModelIdMap>,

    /// System models, e.g. `title_generator → gpt-4o-mini`.
    pub system_models: HashMap<UsageType, ModelIdMap>,
}

impl ModelAssignments {
    /// Sets a default model id for a usage type.
    #[must_use]
    pub fn with_default(
        mut self,
        usage_type: UsageType,
        key: impl Into<String>,
        model_id: Option<&str>,
    ) -> Self {
        self.default_models
            .entry(usage_type)
            .or_default()
            .insert(key.into(), model_id.map(str::to_string));
        self
    }

    /// Sets a system model id for a usage type.
    #[must_use]
    pub fn with_system(
        mut self,
        usage_type: UsageType,
        key: impl Into<String>,
        model_id: Option<&str>,
    ) -> Self {
        self.system_models
            .entry(usage_type)
            .or_default()
            .insert(key.into(), model_id.map(str::to_string));
        self
    }
}

// ============================================================================
// Status & Details
// ============================================================================

/// Reachability of a model as reported by its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// The model answered.
    Online,
    /// The model did not answer.
    Offline,
    /// The status could not be determined.
    #[default]
    Unknown,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Details a client reports about one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    /// Model id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Current status.
    pub status: ModelStatus,
    /// Capability metadata.
    #[serde(default)]
    pub capabilities: ModelCapabilities,
}

impl ModelDetails {
    /// Builds details straight from a descriptor.
    pub fn from_descriptor(descriptor: &ModelDescriptor, status: ModelStatus) -> Self {
        Self {
            id: descriptor.id.clone(),
            label: descriptor.display_label().to_string(),
            status,
            capabilities: descriptor.capabilities.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
