//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.staged_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.staged_dir must not be empty".into(),
            ));
        }
        if self.storage.processed_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.processed_dir must not be empty".into(),
            ));
        }
        if self.storage.staged_dir == self.storage.processed_dir {
            return Err(ConfigError::ValidationError(
                "storage.staged_dir and storage.processed_dir must differ".into(),
            ));
        }
        if self.storage.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.allowed_extensions must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(ConfigError::ValidationError(
                "watermark.opacity must be between 0.0 and 1.0".into(),
            ));
        }
        if !(self.watermark.scale > 0.0 && self.watermark.scale <= 1.0) {
            return Err(ConfigError::ValidationError(
                "watermark.scale must be in (0.0, 1.0]".into(),
            ));
        }
        if self.encode.jpeg_quality == 0 || self.encode.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "encode.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.retention.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retention.ttl_secs must be > 0".into(),
            ));
        }
        if self.retention.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retention.sweep_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
