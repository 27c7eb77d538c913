//! Output format policy: container choice, mode restoration, HEIC fallback.

use image::DynamicImage;
use std::path::{Path, PathBuf};

use crate::config::EncodeConfig;
use crate::error::PipelineError;
use crate::types::{ColorMode, ImageAsset, SourceFormat};

use super::encode::{ImageEncoder, OutputFormat};

/// Prefix of every processed file name.
pub const OUTPUT_PREFIX: &str = "watermarked_";

/// Where a source format's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPlan {
    pub format: OutputFormat,
    /// Used when encoding to `format` fails
    pub fallback: Option<OutputFormat>,
}

impl OutputPlan {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Pick the output container for a source format.
///
/// | source     | output | fallback |
/// |------------|--------|----------|
/// | JPEG       | JPEG   | -        |
/// | PNG        | PNG    | -        |
/// | HEIC/HEIF  | HEIC   | JPEG     |
/// | other      | JPEG   | -        |
pub fn choose_output(source: &SourceFormat) -> OutputPlan {
    match source {
        SourceFormat::Jpeg => OutputPlan {
            format: OutputFormat::Jpeg,
            fallback: None,
        },
        SourceFormat::Png => OutputPlan {
            format: OutputFormat::Png,
            fallback: None,
        },
        SourceFormat::Heic => OutputPlan {
            format: OutputFormat::Heic,
            fallback: Some(OutputFormat::Jpeg),
        },
        SourceFormat::Other(_) => OutputPlan {
            format: OutputFormat::Jpeg,
            fallback: None,
        },
    }
}

/// Convert the RGBA working buffer back to the source's mode when that mode
/// is RGB, grayscale, or palette. Other modes keep the alpha-capable buffer.
///
/// Palette sources come back as RGB; re-quantizing is not attempted.
pub fn restore_color_mode(asset: ImageAsset) -> ImageAsset {
    if !asset.color.is_restorable() {
        return asset;
    }
    let color = asset.color;
    asset.map_image(|image| match color {
        ColorMode::Luma => DynamicImage::ImageLuma8(image.into_luma8()),
        _ => DynamicImage::ImageRgb8(image.into_rgb8()),
    })
}

/// `watermarked_<stem><ext>`, where stem is `original` without its extension.
pub fn output_name(original: &str, format: OutputFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original);
    format!("{OUTPUT_PREFIX}{stem}{}", format.extension())
}

/// A file the dispatcher wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    pub filename: String,
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Whether the plan's fallback was used
    pub fell_back: bool,
}

/// Encode `asset` into `dir` following `plan`.
///
/// When the primary encode fails and the plan names a fallback, the same
/// buffer is encoded again in the fallback format. The failure is logged as a
/// warning and the caller only sees the fallback's result.
pub fn encode_with_fallback(
    encoder: &dyn ImageEncoder,
    asset: &ImageAsset,
    plan: OutputPlan,
    config: &EncodeConfig,
    dir: &Path,
    original: &str,
) -> Result<EncodedOutput, PipelineError> {
    let filename = output_name(original, plan.format);
    let path = dir.join(&filename);

    let primary = encoder.encode(&asset.image, plan.format, config, &path);
    let (err, fallback) = match (primary, plan.fallback) {
        (Ok(()), _) => {
            return Ok(EncodedOutput {
                filename,
                path,
                format: plan.format,
                fell_back: false,
            })
        }
        (Err(e), None) => return Err(e),
        (Err(e), Some(fallback)) => (e, fallback),
    };

    let fallback_name = output_name(original, fallback);
    let fallback_path = dir.join(&fallback_name);
    tracing::warn!(
        "{} encode failed for {}, writing {} instead: {}",
        plan.format,
        original,
        fallback_name,
        err
    );

    encoder.encode(&asset.image, fallback, config, &fallback_path)?;
    Ok(EncodedOutput {
        filename: fallback_name,
        path: fallback_path,
        format: fallback,
        fell_back: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::CodecEncoder;
    use std::sync::Mutex;

    /// Fails every encode of `fail`, records all attempts.
    struct FlakyEncoder {
        fail: OutputFormat,
        attempts: Mutex<Vec<OutputFormat>>,
    }

    impl ImageEncoder for FlakyEncoder {
        fn encode(
            &self,
            image: &DynamicImage,
            format: OutputFormat,
            config: &EncodeConfig,
            path: &Path,
        ) -> Result<(), PipelineError> {
            self.attempts.lock().unwrap().push(format);
            if format == self.fail {
                return Err(PipelineError::EncodeFailure {
                    path: path.to_path_buf(),
                    format: format.to_string(),
                    message: "simulated".to_string(),
                });
            }
            CodecEncoder.encode(image, format, config, path)
        }
    }

    fn asset(format: SourceFormat) -> ImageAsset {
        ImageAsset::new(DynamicImage::new_rgba8(6, 6), format)
    }

    #[test]
    fn test_choose_output_table() {
        let jpeg = choose_output(&SourceFormat::Jpeg);
        assert_eq!((jpeg.format, jpeg.extension(), jpeg.fallback), (OutputFormat::Jpeg, ".jpg", None));

        let png = choose_output(&SourceFormat::Png);
        assert_eq!((png.format, png.extension(), png.fallback), (OutputFormat::Png, ".png", None));

        let heic = choose_output(&SourceFormat::Heic);
        assert_eq!(
            (heic.format, heic.extension(), heic.fallback),
            (OutputFormat::Heic, ".heic", Some(OutputFormat::Jpeg))
        );

        let other = choose_output(&SourceFormat::Other("avif".to_string()));
        assert_eq!((other.format, other.extension(), other.fallback), (OutputFormat::Jpeg, ".jpg", None));
    }

    #[test]
    fn test_choose_output_is_pure() {
        for source in [
            SourceFormat::Jpeg,
            SourceFormat::Png,
            SourceFormat::Heic,
            SourceFormat::Other("bmp".to_string()),
        ] {
            assert_eq!(choose_output(&source), choose_output(&source));
        }
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("a.jpg", OutputFormat::Jpeg), "watermarked_a.jpg");
        assert_eq!(output_name("b.PNG", OutputFormat::Png), "watermarked_b.png");
        assert_eq!(output_name("IMG_0001.heic", OutputFormat::Jpeg), "watermarked_IMG_0001.jpg");
        assert_eq!(output_name("my.trip.jpeg", OutputFormat::Jpeg), "watermarked_my.trip.jpg");
    }

    #[test]
    fn test_restore_color_mode() {
        let rgba = DynamicImage::new_rgba8(3, 3);

        let rgb = restore_color_mode(ImageAsset::with_color(rgba.clone(), SourceFormat::Jpeg, ColorMode::Rgb));
        assert!(matches!(rgb.image, DynamicImage::ImageRgb8(_)));

        let gray = restore_color_mode(ImageAsset::with_color(rgba.clone(), SourceFormat::Png, ColorMode::Luma));
        assert!(matches!(gray.image, DynamicImage::ImageLuma8(_)));

        let palette = restore_color_mode(ImageAsset::with_color(rgba.clone(), SourceFormat::Png, ColorMode::Palette));
        assert!(matches!(palette.image, DynamicImage::ImageRgb8(_)));
        assert_eq!(palette.color, ColorMode::Palette);

        let kept = restore_color_mode(ImageAsset::with_color(rgba.clone(), SourceFormat::Png, ColorMode::Rgba));
        assert!(matches!(kept.image, DynamicImage::ImageRgba8(_)));

        let la = restore_color_mode(ImageAsset::with_color(rgba, SourceFormat::Png, ColorMode::LumaAlpha));
        assert!(matches!(la.image, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn test_heic_failure_falls_back_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FlakyEncoder {
            fail: OutputFormat::Heic,
            attempts: Mutex::new(vec![]),
        };
        let plan = choose_output(&SourceFormat::Heic);

        let out = encode_with_fallback(
            &encoder,
            &asset(SourceFormat::Heic),
            plan,
            &EncodeConfig::default(),
            dir.path(),
            "IMG_1.heic",
        )
        .unwrap();

        assert_eq!(out.filename, "watermarked_IMG_1.jpg");
        assert_eq!(out.format, OutputFormat::Jpeg);
        assert!(out.fell_back);
        assert!(out.path.exists());
        assert!(!dir.path().join("watermarked_IMG_1.heic").exists());
        assert_eq!(
            *encoder.attempts.lock().unwrap(),
            [OutputFormat::Heic, OutputFormat::Jpeg]
        );
    }

    #[test]
    fn test_failure_without_fallback_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FlakyEncoder {
            fail: OutputFormat::Png,
            attempts: Mutex::new(vec![]),
        };

        let err = encode_with_fallback(
            &encoder,
            &asset(SourceFormat::Png),
            choose_output(&SourceFormat::Png),
            &EncodeConfig::default(),
            dir.path(),
            "b.png",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EncodeFailure { .. }));
        assert_eq!(*encoder.attempts.lock().unwrap(), [OutputFormat::Png]);
    }

    #[test]
    fn test_primary_success_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = encode_with_fallback(
            &CodecEncoder,
            &asset(SourceFormat::Png),
            choose_output(&SourceFormat::Png),
            &EncodeConfig::default(),
            dir.path(),
            "b.png",
        )
        .unwrap();
        assert_eq!(out.filename, "watermarked_b.png");
        assert!(!out.fell_back);
    }
}
