//! Configuration management for Strandmark.
//!
//! Configuration is loaded from `~/.strandmark/config.toml` (or the platform
//! config directory) with sensible defaults for every section.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Strandmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Change detection settings
    pub watch: WatchConfig,

    /// Pipeline pacing and queue settings
    pub pipeline: PipelineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Constellation signature settings
    pub constellation: ConstellationConfig,

    /// Remote registration settings
    pub registration: RegistrationConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.strandmark.strandmark/config.toml
    /// - Linux: ~/.config/strandmark/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\strandmark\config\config.toml
    ///
    /// Falls back to ~/.strandmark/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "strandmark", "strandmark")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".strandmark").join("config.toml")
            })
    }

    /// Get the resolved artifact output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.general.output_dir)
    }

    /// Get the resolved watched directory (with ~ expansion).
    pub fn source_dir(&self) -> PathBuf {
        expand(&self.watch.source_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.constellation.grid_size, 8);
        assert_eq!(config.watch.settle_delay_ms, 800);
        assert_eq!(config.pipeline.pace_delay_ms, 300);
        assert_eq!(config.pipeline.max_queue_depth, 0);
        assert!(!config.registration.enabled);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[constellation]"));
        assert!(toml.contains("[registration]"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[constellation]\ngrid_size = 4\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.constellation.grid_size, 4);
        assert_eq!(config.watch.settle_delay_ms, 800);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[constellation]\ngrid_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("grid_size"));
    }

    #[test]
    fn test_output_dir_expands_tilde() {
        let config = Config::default();
        let dir = config.output_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
    }
}
