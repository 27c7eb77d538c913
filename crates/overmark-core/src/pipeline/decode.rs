//! Image decoding with format detection, orientation correction and limits.

use image::{DynamicImage, ImageError, ImageFormat};
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::{ColorMode, ImageAsset, SourceFormat};

use super::heif;
use super::metadata::MetadataExtractor;
use super::validate::Validator;

/// PNG color type 3: indexed color.
const PNG_INDEXED: u8 = 3;

/// Turns a staged file into an upright [`ImageAsset`].
///
/// [`ImageDecoder`] is the production implementation. The batch takes any
/// implementation through `BatchProcessor::with_decoder`.
pub trait AssetDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<ImageAsset, PipelineError>;
}

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    limits: LimitsConfig,
    validator: Validator,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits.clone()),
            limits,
        }
    }

    /// Decode a JPEG, PNG or HEIC/HEIF file into an upright `ImageAsset`.
    pub fn decode(&self, path: &Path) -> Result<ImageAsset, PipelineError> {
        let format = self.validator.validate(path)?;
        let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
        let asset = Self::decode_bytes(&bytes, format, path)?;

        if asset.width > self.limits.max_image_dimension
            || asset.height > self.limits.max_image_dimension
        {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width: asset.width,
                height: asset.height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        tracing::trace!(
            "  Decoded {:?} as {} {}x{} ({:?})",
            path,
            asset.format,
            asset.width,
            asset.height,
            asset.color
        );
        Ok(asset)
    }

    /// Decode already-read bytes of a known format.
    fn decode_bytes(
        bytes: &[u8],
        format: SourceFormat,
        path: &Path,
    ) -> Result<ImageAsset, PipelineError> {
        match format {
            SourceFormat::Jpeg | SourceFormat::Png => {
                let codec = if format == SourceFormat::Jpeg {
                    ImageFormat::Jpeg
                } else {
                    ImageFormat::Png
                };
                let mut image = image::load_from_memory_with_format(bytes, codec)
                    .map_err(|e| map_image_error(e, path, &format))?;

                if let Some(orientation) = MetadataExtractor::orientation(bytes) {
                    tracing::trace!("  Applying EXIF orientation {:?}", orientation);
                    image.apply_orientation(orientation);
                }

                let color = if format == SourceFormat::Png && is_indexed_png(bytes) {
                    ColorMode::Palette
                } else {
                    ColorMode::of(&image)
                };
                Ok(ImageAsset::with_color(image, format, color))
            }
            SourceFormat::Heic => {
                if !heif::is_available() {
                    return Err(PipelineError::UnsupportedFormat {
                        path: path.to_path_buf(),
                        format: "heic (built without HEIC support)".to_string(),
                    });
                }
                let image: DynamicImage =
                    heif::decode(bytes).map_err(|message| PipelineError::CorruptInput {
                        path: path.to_path_buf(),
                        message,
                    })?;
                Ok(ImageAsset::new(image, SourceFormat::Heic))
            }
            SourceFormat::Other(name) => Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: name,
            }),
        }
    }
}

fn map_image_error(err: ImageError, path: &Path, format: &SourceFormat) -> PipelineError {
    match err {
        ImageError::Unsupported(e) => PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: format!("{format}: {e}"),
        },
        other => PipelineError::CorruptInput {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

/// Whether a PNG's IHDR declares indexed color.
///
/// Layout: 8-byte signature, 4-byte length, "IHDR", width, height, bit depth,
/// then the color type at offset 25.
fn is_indexed_png(bytes: &[u8]) -> bool {
    bytes.len() > 25 && &bytes[12..16] == b"IHDR" && bytes[25] == PNG_INDEXED
}

impl AssetDecoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageAsset, PipelineError> {
        ImageDecoder::decode(self, path)
    }
}
