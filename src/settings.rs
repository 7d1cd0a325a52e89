use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::FileError;

/// Tunables for the load and snapshot pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Readiness checks before a load gives up with a timeout.
    #[serde(default = "default_max_readiness_checks")]
    pub max_readiness_checks: u32,

    /// Ceiling on the backoff between readiness checks, in queue turns.
    #[serde(default = "default_readiness_backoff_cap")]
    pub readiness_backoff_cap: u32,

    /// Reload cycles a migration may demand before the load is declared
    /// non-convergent.
    #[serde(default = "default_max_migration_reloads")]
    pub max_migration_reloads: u32,

    /// Stylesheets injected into the surface for the editing session.
    #[serde(default = "default_edition_stylesheets")]
    pub edition_stylesheets: Vec<String>,

    /// Base the edition stylesheets resolve against.
    #[serde(default = "default_editor_base_url")]
    pub editor_base_url: String,

    #[serde(default = "default_beautify_indent")]
    pub beautify_indent: usize,
}

fn default_max_readiness_checks() -> u32 {
    8
}

fn default_readiness_backoff_cap() -> u32 {
    8
}

fn default_max_migration_reloads() -> u32 {
    3
}

fn default_edition_stylesheets() -> Vec<String> {
    vec!["css/editable.css".to_string()]
}

fn default_editor_base_url() -> String {
    "/".to_string()
}

fn default_beautify_indent() -> usize {
    2
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_readiness_checks: default_max_readiness_checks(),
            readiness_backoff_cap: default_readiness_backoff_cap(),
            max_migration_reloads: default_max_migration_reloads(),
            edition_stylesheets: default_edition_stylesheets(),
            editor_base_url: default_editor_base_url(),
            beautify_indent: default_beautify_indent(),
        }
    }
}

impl FileConfig {
    /// Load the config from disk, or create defaults if not present.
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist, use defaults
                let default = Self::default();
                // Try to save defaults for next time
                let _ = default.save();
                default
            }
        }
    }

    /// Save the config to disk.
    pub fn save(&self) -> Result<(), FileError> {
        let config_path = Self::get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)?;

        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("sitepad");
        path.push("config.json");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.max_readiness_checks, 8);
        assert_eq!(config.max_migration_reloads, 3);
        assert_eq!(config.edition_stylesheets, vec!["css/editable.css"]);
        assert_eq!(config.editor_base_url, "/");
        assert_eq!(config.beautify_indent, 2);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = FileConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: FileConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_config() {
        // Config written by an older release missing new fields
        let json = r#"{"max_readiness_checks": 4}"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_readiness_checks, 4);
        assert_eq!(config.max_migration_reloads, 3);
        assert_eq!(config.editor_base_url, "/");
    }
}
