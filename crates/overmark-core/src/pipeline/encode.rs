//! Re-encoding of composited images.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::config::{EncodeConfig, PngCompression};
use crate::error::PipelineError;
use crate::store::set_shared_mode;

use super::heif;

/// Container an output is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Heic,
}

impl OutputFormat {
    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Heic => ".heic",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::Heic => write!(f, "heic"),
        }
    }
}

/// Writes an image to disk in a given container.
///
/// The batch processor talks to codecs only through this trait.
pub trait ImageEncoder: Send + Sync {
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        config: &EncodeConfig,
        path: &Path,
    ) -> Result<(), PipelineError>;
}

/// Production encoder backed by the `image` crate and, for HEIC, libheif.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodecEncoder;

impl CodecEncoder {
    /// Encode into memory.
    pub fn encode_to_vec(
        image: &DynamicImage,
        format: OutputFormat,
        config: &EncodeConfig,
    ) -> Result<Vec<u8>, String> {
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut bytes, config.jpeg_quality);
                jpeg_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| e.to_string())?;
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut bytes,
                    png_compression(config.png_compression),
                    FilterType::NoFilter,
                );
                png_compatible(image)
                    .write_with_encoder(encoder)
                    .map_err(|e| e.to_string())?;
            }
            OutputFormat::Heic => bytes = heif::encode(image)?,
        }
        Ok(bytes)
    }
}

impl ImageEncoder for CodecEncoder {
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        config: &EncodeConfig,
        path: &Path,
    ) -> Result<(), PipelineError> {
        let bytes =
            Self::encode_to_vec(image, format, config).map_err(|message| {
                PipelineError::EncodeFailure {
                    path: path.to_path_buf(),
                    format: format.to_string(),
                    message,
                }
            })?;
        write_atomic(path, &bytes)
    }
}

/// Write `bytes` to a temp file beside `path`, then rename it into place.
///
/// Readers listing the directory never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".overmark-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| PipelineError::io(path, e))?;
    set_shared_mode(tmp.as_file()).map_err(|e| PipelineError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    Ok(())
}

/// JPEG carries 8-bit gray or RGB only; alpha is dropped.
fn jpeg_compatible(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// PNG has no float layouts; everything else passes through.
fn png_compatible(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
        DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(image.to_rgba16()),
        _ => image.clone(),
    }
}

fn png_compression(level: PngCompression) -> CompressionType {
    match level {
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Default => CompressionType::Default,
        PngCompression::Best => CompressionType::Best,
    }
}
