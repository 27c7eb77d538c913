//! Core data types for the Overmark pipeline and file stores.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Container format an image was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
    /// HEIC or HEIF (same ISO-BMFF container)
    Heic,
    /// Anything else the decoder could read, tagged by name
    Other(String),
}

impl SourceFormat {
    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "heic" | "heif" => Some(Self::Heic),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::Heic => write!(f, "heic"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Pixel layout of the decoded source, before any working conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 8/16-bit grayscale
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
    /// Indexed PNG (expanded to RGB/RGBA in memory)
    Palette,
    /// Float or otherwise unusual layouts
    Other,
}

impl ColorMode {
    /// Derive the mode from a decoded buffer.
    pub fn of(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => Self::Luma,
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => Self::LumaAlpha,
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgb16(_) => Self::Rgb,
            DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_) => Self::Rgba,
            _ => Self::Other,
        }
    }

    /// Whether the output is converted back to this mode after compositing.
    pub fn is_restorable(self) -> bool {
        matches!(self, Self::Rgb | Self::Luma | Self::Palette)
    }
}

/// A decoded, upright image owned by the pipeline stage working on it.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Pixel buffer
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    /// Mode of the source file, kept across working conversions
    pub color: ColorMode,
    /// Container the pixels came from
    pub format: SourceFormat,
}

impl ImageAsset {
    /// Wrap a buffer, deriving dimensions and color mode from it.
    pub fn new(image: DynamicImage, format: SourceFormat) -> Self {
        let color = ColorMode::of(&image);
        Self::with_color(image, format, color)
    }

    /// Wrap a buffer whose source mode differs from the buffer's own layout.
    pub fn with_color(image: DynamicImage, format: SourceFormat, color: ColorMode) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            image,
            color,
            format,
        }
    }

    /// Replace the pixel buffer, keeping source format and mode.
    pub fn map_image(self, f: impl FnOnce(DynamicImage) -> DynamicImage) -> Self {
        let image = f(self.image);
        Self::with_color(image, self.format, self.color)
    }
}

/// A file held by one of the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// File name, the store's key
    pub name: String,
    /// Absolute on-disk location
    pub path: PathBuf,
    /// Last modification time, used for retention
    pub modified: SystemTime,
    /// Size in bytes
    pub size: u64,
}

/// One successfully watermarked file, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Output file name in the processed store
    pub filename: String,
    /// Download location (`<download_prefix><filename>`)
    pub download_path: String,
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Files inspected across both stores
    pub scanned: usize,
    /// Files deleted for being past the retention window
    pub evicted: Vec<String>,
    /// Deletions or listings that failed and were skipped
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("JPG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("jpeg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("png"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_extension("HEIF"), Some(SourceFormat::Heic));
        assert_eq!(SourceFormat::from_extension("gif"), None);
    }

    #[test]
    fn test_color_mode_of_buffers() {
        assert_eq!(ColorMode::of(&DynamicImage::new_rgb8(1, 1)), ColorMode::Rgb);
        assert_eq!(ColorMode::of(&DynamicImage::new_rgba8(1, 1)), ColorMode::Rgba);
        assert_eq!(ColorMode::of(&DynamicImage::new_luma8(1, 1)), ColorMode::Luma);
        assert_eq!(
            ColorMode::of(&DynamicImage::new_luma_a8(1, 1)),
            ColorMode::LumaAlpha
        );
    }

    #[test]
    fn test_restorable_modes() {
        assert!(ColorMode::Rgb.is_restorable());
        assert!(ColorMode::Luma.is_restorable());
        assert!(ColorMode::Palette.is_restorable());
        assert!(!ColorMode::Rgba.is_restorable());
        assert!(!ColorMode::LumaAlpha.is_restorable());
    }

    #[test]
    fn test_batch_item_serializes() {
        let item = BatchItem {
            filename: "watermarked_a.jpg".to_string(),
            download_path: "/download/watermarked_a.jpg".to_string(),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"filename\":\"watermarked_a.jpg\""));
    }
}
