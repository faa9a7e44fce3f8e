//! File persistence helpers.
//!
//! Loads and saves JSON/YAML documents. Written files are owner-only on Unix
//! since the gateway configuration carries API keys.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory, e.g. `~/.config/modelgate`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("modelgate"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default data directory, e.g. `~/.local/share/modelgate`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("modelgate"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default gateway configuration file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("gateway.yaml")
}

/// Returns the default usage ledger file path.
pub fn default_ledger_path() -> PathBuf {
    default_data_dir().join("usage_ledger.json")
}

// ============================================================================
// Document Format
// ============================================================================

/// On-disk document format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.json` and anything unrecognized.
    Json,
    /// `.yaml` / `.yml`.
    Yaml,
}

impl DocumentFormat {
    /// Detects the format of a path.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }

    /// Parses a document.
    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T, StoreError> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Renders a document.
    pub fn render<T: Serialize>(self, data: &T) -> Result<String, StoreError> {
        Ok(match self {
            Self::Json => serde_json::to_string_pretty(data)?,
            Self::Yaml => serde_yaml::to_string(data)?,
        })
    }
}

// ============================================================================
// Security: File Permissions
// ============================================================================

#[cfg(unix)]
async fn set_owner_only(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0600", "Set owner-only permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data as JSON or YAML, depending on the extension.
///
/// Creates parent directories, writes through a temp file + rename, and
/// restricts permissions on Unix.
pub async fn save_document<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving document");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let content = DocumentFormat::from_path(path).render(data)?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    tokio::fs::write(&temp_path, &content).await?;
    tokio::fs::rename(&temp_path, path).await?;

    set_owner_only(path).await?;
    Ok(())
}

/// Loads a JSON or YAML document, depending on the extension.
pub async fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading document");

    let content = tokio::fs::read_to_string(path).await?;
    DocumentFormat::from_path(path).parse(&content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("gateway.yaml"));
        assert!(default_ledger_path().ends_with("usage_ledger.json"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a")), DocumentFormat::Json);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("secret.json");
        save_document(&path, &serde_json::json!({"api_key": "k"}))
            .await
            .unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
