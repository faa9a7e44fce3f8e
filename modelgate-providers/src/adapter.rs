//! Adapter kinds and adapter-name handling.
//!
//! Adapters are a closed set. Configuration names them with free-form
//! strings (`OpenAiProvider`, `openai`, `OpenWebUiProvider`, ...); this
//! module turns such strings into an [`AdapterKind`] and derives the
//! conventional adapter name from a format key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix stripped from format keys before deriving an adapter name.
pub const FORMAT_SUFFIX: &str = "-api";

/// Suffix appended to derived adapter names.
pub const ADAPTER_SUFFIX: &str = "Provider";

// ============================================================================
// Adapter Kind
// ============================================================================

/// Every adapter the gateway knows about, plus the generic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// OpenAI chat completions.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Ollama local runtime.
    Ollama,
    /// Google Generative Language API.
    Google,
    /// Google Vertex AI.
    VertexAi,
    /// GWDG academic cloud.
    Gwdg,
    /// Open WebUI.
    OpenWebUi,
    /// Hugging Face inference.
    HuggingFace,
    /// Cohere.
    Cohere,
    /// OpenAI-compatible fallback used when nothing else resolves.
    Generic,
}

impl AdapterKind {
    /// Returns every kind, fallback last.
    pub fn all() -> &'static [AdapterKind] {
        &[
            Self::OpenAi,
            Self::Anthropic,
            Self::Ollama,
            Self::Google,
            Self::VertexAi,
            Self::Gwdg,
            Self::OpenWebUi,
            Self::HuggingFace,
            Self::Cohere,
            Self::Generic,
        ]
    }

    /// Returns the canonical adapter name, e.g. `OpenAiProvider`.
    pub fn adapter_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAiProvider",
            Self::Anthropic => "AnthropicProvider",
            Self::Ollama => "OllamaProvider",
            Self::Google => "GoogleProvider",
            Self::VertexAi => "VertexAiProvider",
            Self::Gwdg => "GwdgProvider",
            Self::OpenWebUi => "OpenWebUiProvider",
            Self::HuggingFace => "HuggingFaceProvider",
            Self::Cohere => "CohereProvider",
            Self::Generic => "GenericModelProvider",
        }
    }

    /// Returns true for adapters that speak the OpenAI chat completions
    /// dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            Self::OpenAi | Self::Anthropic | Self::Gwdg | Self::OpenWebUi | Self::Generic
        )
    }

    /// Parses a configured adapter name.
    ///
    /// Matching ignores case, punctuation and a trailing `Provider`, so
    /// `OpenAIProvider`, `open-ai` and `openai` all resolve to
    /// [`AdapterKind::OpenAi`]. Returns `None` for unknown names.
    pub fn from_adapter_name(name: &str) -> Option<Self> {
        let mut key: String = name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if let Some(stripped) = key.strip_suffix("provider") {
            key = stripped.to_string();
        }

        let kind = match key.as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "ollama" => Self::Ollama,
            "google" | "googlegenerativelanguage" | "gemini" => Self::Google,
            "vertexai" | "googlevertexai" => Self::VertexAi,
            "gwdg" => Self::Gwdg,
            "openwebui" => Self::OpenWebUi,
            "huggingface" => Self::HuggingFace,
            "cohere" => Self::Cohere,
            "generic" | "genericmodel" => Self::Generic,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.adapter_name())
    }
}

// ============================================================================
// Convention
// ============================================================================

/// Derives the conventional adapter name from a format key.
///
/// `google-generative-language-api` becomes
/// `GoogleGenerativeLanguageProvider`. Returns `None` if nothing is left
/// after stripping the suffix.
pub fn conventional_adapter_name(format_key: &str) -> Option<String> {
    let base = format_key.strip_suffix(FORMAT_SUFFIX).unwrap_or(format_key);

    let pascal: String = base
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect();

    if pascal.is_empty() {
        None
    } else {
        Some(format!("{pascal}{ADAPTER_SUFFIX}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convention_strips_suffix_and_pascal_cases() {
        assert_eq!(
            conventional_adapter_name("google-generative-language-api").as_deref(),
            Some("GoogleGenerativeLanguageProvider")
        );
        assert_eq!(
            conventional_adapter_name("openai-api").as_deref(),
            Some("OpenaiProvider")
        );
        assert_eq!(
            conventional_adapter_name("ollama").as_deref(),
            Some("OllamaProvider")
        );
        assert_eq!(conventional_adapter_name("-api"), None);
        assert_eq!(conventional_adapter_name(""), None);
    }

    #[test]
    fn test_convention_names_parse_back() {
        let cases = [
            ("openai-api", AdapterKind::OpenAi),
            ("ollama-api", AdapterKind::Ollama),
            ("google-generative-language-api", AdapterKind::Google),
            ("google-vertex-ai-api", AdapterKind::VertexAi),
            ("gwdg-api", AdapterKind::Gwdg),
            ("openwebui-api", AdapterKind::OpenWebUi),
            ("huggingface-api", AdapterKind::HuggingFace),
            ("cohere-api", AdapterKind::Cohere),
            ("anthropic-api", AdapterKind::Anthropic),
        ];

        for (format, expected) in cases {
            let name = conventional_adapter_name(format).unwrap();
            assert_eq!(
                AdapterKind::from_adapter_name(&name),
                Some(expected),
                "Failed for {format}"
            );
        }
    }

    #[test]
    fn test_adapter_names_round_trip() {
        for kind in AdapterKind::all() {
            assert_eq!(AdapterKind::from_adapter_name(kind.adapter_name()), Some(*kind));
        }
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(AdapterKind::from_adapter_name("HawkiProvider"), None);
        assert_eq!(AdapterKind::from_adapter_name(""), None);
        assert_eq!(AdapterKind::from_adapter_name("Provider"), None);
    }
}
