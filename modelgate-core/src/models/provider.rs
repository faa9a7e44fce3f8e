//! Provider-related types.
//!
//! This module contains the configuration records the gateway reads:
//! - [`ProviderConfig`] - One configured provider endpoint
//! - [`ApiFormat`] - The wire format a provider speaks

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key under which older format records name their adapter.
pub const LEGACY_ADAPTER_KEY: &str = "provider_class";

fn default_true() -> bool {
    true
}

// ============================================================================
// API Format
// ============================================================================

/// The wire format a provider speaks, e.g. `openai-api` or `ollama-api`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFormat {
    /// Unique key of the format.
    pub unique_name: String,

    /// Explicitly configured adapter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,

    /// Free-form format metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ApiFormat {
    /// Creates a format with only its unique key.
    pub fn new(unique_name: impl Into<String>) -> Self {
        Self {
            unique_name: unique_name.into(),
            adapter: None,
            metadata: Map::new(),
        }
    }

    /// Sets the explicit adapter name.
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the adapter named in the legacy metadata entry, if any.
    pub fn legacy_adapter(&self) -> Option<&str> {
        self.metadata
            .get(LEGACY_ADAPTER_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// A configured provider endpoint.
///
/// Sourced from the configuration store and treated as immutable while a
/// single resolution is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider id.
    pub id: String,

    /// Human readable provider name.
    #[serde(default)]
    pub name: String,

    /// Whether the provider may serve requests.
    #[serde(default = "default_true")]
    pub active: bool,

    /// The wire format of the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_format: Option<ApiFormat>,

    /// Base URL for requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// URL probed for status checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_url: Option<String>,

    /// API key, if the provider needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Opaque adapter settings.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
}

impl ProviderConfig {
    /// Creates an active provider with the given id and format.
    pub fn new(id: impl Into<String>, api_format: ApiFormat) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            active: true,
            api_format: Some(api_format),
            api_url: None,
            ping_url: None,
            api_key: None,
            settings: Value::Null,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Marks the provider as inactive.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the format key used for adapter lookups.
    ///
    /// Falls back to the provider name when no format is attached.
    pub fn format_name(&self) -> &str {
        self.api_format
            .as_ref()
            .map_or(self.name.as_str(), |f| f.unique_name.as_str())
    }

    /// Returns the name to show to humans.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name_prefers_api_format() {
        let config = ProviderConfig::new("p1", ApiFormat::new("openai-api")).with_name("OpenAI");
        assert_eq!(config.format_name(), "openai-api");
    }

    #[test]
    fn test_format_name_falls_back_to_name() {
        let mut config = ProviderConfig::new("p1", ApiFormat::new("x")).with_name("ollama");
        config.api_format = None;
        assert_eq!(config.format_name(), "ollama");
    }

    #[test]
    fn test_legacy_adapter_ignores_blank() {
        let format = ApiFormat::new("gwdg-api").with_metadata(LEGACY_ADAPTER_KEY, "  ");
        assert!(format.legacy_adapter().is_none());

        let format = ApiFormat::new("gwdg-api").with_metadata(LEGACY_ADAPTER_KEY, "GwdgProvider");
        assert_eq!(format.legacy_adapter(), Some("GwdgProvider"));
    }

    #[test]
    fn test_active_defaults_to_true() {
        let config: ProviderConfig = serde_json::from_str(r#"{"id": "p"}"#).unwrap();
        assert!(config.active);
        assert_eq!(config.display_name(), "p");
    }
}
