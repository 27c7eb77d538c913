//! Configuration management for Overmark.
//!
//! Configuration is loaded from a TOML file with sensible defaults. It is
//! built once at startup and handed to each component; nothing reads it
//! through globals.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure for Overmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store directories and naming
    pub storage: StorageConfig,

    /// Logo overlay settings
    pub watermark: WatermarkConfig,

    /// Output quality policy
    pub encode: EncodeConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Retention sweep settings
    pub retention: RetentionConfig,

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
    /// - macOS: ~/Library/Application Support/com.overmark.overmark/config.toml
    /// - Linux: ~/.config/overmark/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\overmark\config\config.toml
    ///
    /// Falls back to ~/.overmark/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "overmark", "overmark")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".overmark").join("config.toml")
            })
    }

    /// Resolved staged store directory (with ~ expansion).
    pub fn staged_dir(&self) -> PathBuf {
        expand(&self.storage.staged_dir)
    }

    /// Resolved processed store directory (with ~ expansion).
    pub fn processed_dir(&self) -> PathBuf {
        expand(&self.storage.processed_dir)
    }

    /// Resolved logo path (with ~ expansion).
    pub fn logo_path(&self) -> PathBuf {
        expand(&self.watermark.logo_path)
    }

    /// Retention window.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.retention.ttl_secs)
    }

    /// Time between retention sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention.sweep_interval_secs)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}
