//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the staged and processed stores live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Uploaded-but-unprocessed images
    pub staged_dir: PathBuf,

    /// Watermarked outputs
    pub processed_dir: PathBuf,

    /// Extensions both stores recognize (case-insensitive, no dot)
    pub allowed_extensions: Vec<String>,

    /// Prefix joined with an output file name to form its download path
    pub download_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staged_dir: PathBuf::from("~/.overmark/uploads"),
            processed_dir: PathBuf::from("~/.overmark/watermarked"),
            allowed_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "heic".to_string(),
                "heif".to_string(),
            ],
            download_prefix: "/download/".to_string(),
        }
    }
}

/// Corner of the base image the logo is anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Logo overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Logo image (any format the `image` crate reads; PNG with alpha recommended)
    pub logo_path: PathBuf,

    /// Fraction of the logo's own alpha kept, 0.0–1.0
    pub opacity: f32,

    /// Logo width as a fraction of the base image width
    pub scale: f32,

    /// Inset from the anchored corner, in pixels, on both axes
    pub padding: u32,

    /// Anchor corner
    pub corner: Corner,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            logo_path: PathBuf::from("~/.overmark/logo.png"),
            opacity: 0.5,
            scale: 0.2,
            padding: 20,
            corner: Corner::BottomRight,
        }
    }
}

/// zlib effort for PNG output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Fastest, largest files
    #[default]
    Fast,
    Default,
    Best,
}

/// Re-encoding quality policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// JPEG quality, 1–100
    pub jpeg_quality: u8,

    /// PNG compression level
    pub png_compression: PngCompression,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 100,
            png_compression: PngCompression::Fast,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Age-based eviction of staged and processed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Files older than this many seconds are evicted
    pub ttl_secs: u64,

    /// Seconds between sweeps
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
