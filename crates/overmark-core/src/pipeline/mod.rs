//! Image processing pipeline components.
//!
//! This module contains all the stages of the watermarking pipeline:
//! - **validate**: Pre-decode checks and content sniffing
//! - **metadata**: EXIF orientation lookup
//! - **heif**: HEIC/HEIF codec bridge (behind the `heic` feature)
//! - **decode**: Load and decode images into upright buffers
//! - **watermark**: Logo scaling, fading and alpha compositing
//! - **encode**: Container encoders with atomic writes
//! - **dispatch**: Output format choice and HEIC → JPEG fallback
//! - **processor**: Orchestrates a batch over the staged store

pub mod decode;
pub mod dispatch;
pub mod encode;
pub mod heif;
pub mod metadata;
pub mod processor;
pub mod validate;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use decode::{AssetDecoder, ImageDecoder};
pub use dispatch::{choose_output, encode_with_fallback, restore_color_mode, EncodedOutput, OutputPlan};
pub use encode::{CodecEncoder, ImageEncoder, OutputFormat};
pub use metadata::MetadataExtractor;
pub use processor::BatchProcessor;
pub use validate::Validator;
pub use watermark::{Compositor, WatermarkSpec};
