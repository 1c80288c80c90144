//! # Plugin Manifests
//!
//! `manifest.json` parsing and validation. A manifest that fails
//! validation only skips its own plugin; discovery always continues.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name every plugin directory must contain.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Default entry file relative to the plugin directory.
pub const DEFAULT_MAIN: &str = "plugin.wasm";

/// Errors from reading or validating a plugin manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("cannot read manifest: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest is not valid JSON or misses required fields.
    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is present but empty.
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),

    /// The id is not a lowercase alphanumeric/dash slug.
    #[error("invalid plugin id `{0}` (expected [a-z0-9-]+)")]
    InvalidId(String),

    /// The version is not MAJOR.MINOR.PATCH.
    #[error("invalid version `{0}` (expected MAJOR.MINOR.PATCH)")]
    InvalidVersion(String),
}

/// The declarative descriptor of a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Unique plugin id (slug).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// MAJOR.MINOR.PATCH version.
    pub version: String,
    /// Entry file relative to the plugin directory.
    #[serde(default = "default_main")]
    pub main: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional author.
    #[serde(default)]
    pub author: Option<String>,
    /// Whether the host enables the plugin automatically on start.
    #[serde(default = "default_true")]
    pub auto_enable: bool,
}

fn default_main() -> String {
    DEFAULT_MAIN.to_string()
}

fn default_true() -> bool {
    true
}

impl PluginManifest {
    /// Read and validate the manifest inside a plugin directory.
    pub fn load(plugin_dir: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(plugin_dir.join(MANIFEST_FILE_NAME))?;
        let manifest: Self = serde_json::from_str(&raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check field format constraints.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.id.is_empty() {
            return Err(ManifestError::EmptyField("id"));
        }
        if self.name.is_empty() {
            return Err(ManifestError::EmptyField("name"));
        }
        if self.version.is_empty() {
            return Err(ManifestError::EmptyField("version"));
        }

        let slug_ok = self
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(ManifestError::InvalidId(self.id.clone()));
        }

        let parts: Vec<&str> = self.version.split('.').collect();
        let version_ok = parts.len() == 3
            && parts
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !version_ok {
            return Err(ManifestError::InvalidVersion(self.version.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str, version: &str) -> PluginManifest {
        PluginManifest {
            id: id.to_string(),
            name: "Test Plugin".to_string(),
            version: version.to_string(),
            main: default_main(),
            description: None,
            author: None,
            auto_enable: true,
        }
    }

    #[test]
    fn test_valid_manifest() {
        assert!(manifest("clock-widget", "1.0.3").validate().is_ok());
    }

    #[test]
    fn test_uppercase_or_underscore_id_rejected() {
        assert!(matches!(
            manifest("Bad_ID", "1.0.0").validate(),
            Err(ManifestError::InvalidId(_))
        ));
    }

    #[test]
    fn test_two_part_version_rejected() {
        assert!(matches!(
            manifest("ok-id", "1.0").validate(),
            Err(ManifestError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_non_numeric_version_rejected() {
        assert!(matches!(
            manifest("ok-id", "1.0.x").validate(),
            Err(ManifestError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut m = manifest("ok-id", "1.0.0");
        m.name.clear();
        assert!(matches!(m.validate(), Err(ManifestError::EmptyField("name"))));
    }

    #[test]
    fn test_json_defaults() {
        let m: PluginManifest =
            serde_json::from_str(r#"{"id":"a-b","name":"AB","version":"0.1.0"}"#).unwrap();
        assert_eq!(m.main, DEFAULT_MAIN);
        assert!(m.auto_enable);
    }

    #[test]
    fn test_auto_enable_opt_out() {
        let m: PluginManifest = serde_json::from_str(
            r#"{"id":"a-b","name":"AB","version":"0.1.0","autoEnable":false}"#,
        )
        .unwrap();
        assert!(!m.auto_enable);
    }
}
