//! Logo overlay: scaling, fading, placement and source-over blending.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, Corner};
use crate::error::PipelineError;
use crate::types::ImageAsset;

/// Immutable overlay settings, shared by every composition.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    /// Logo image location
    pub logo_path: PathBuf,
    /// Fraction of the logo's alpha kept, 0.0–1.0
    pub opacity: f32,
    /// Logo width as a fraction of the base width
    pub scale: f32,
    /// Anchor corner
    pub corner: Corner,
    /// Inset from the corner on both axes
    pub padding: u32,
}

impl WatermarkSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            logo_path: config.logo_path(),
            opacity: config.watermark.opacity,
            scale: config.watermark.scale,
            corner: config.watermark.corner,
            padding: config.watermark.padding,
        }
    }
}

/// Composites the cached logo onto base images.
///
/// Cheap to clone; clones share the logo buffer.
#[derive(Debug, Clone)]
pub struct Compositor {
    spec: WatermarkSpec,
    logo: Arc<RgbaImage>,
}

impl Compositor {
    /// Load the logo named by `spec` and cache it as RGBA.
    pub fn new(spec: WatermarkSpec) -> Result<Self, PipelineError> {
        let logo = image::open(&spec.logo_path).map_err(|e| PipelineError::Logo {
            path: spec.logo_path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(
            "Loaded logo {:?} ({}x{})",
            spec.logo_path,
            logo.width(),
            logo.height()
        );
        Ok(Self::with_logo(spec, logo.into_rgba8()))
    }

    /// Use an already-decoded logo.
    pub fn with_logo(spec: WatermarkSpec, logo: RgbaImage) -> Self {
        Self {
            spec,
            logo: Arc::new(logo),
        }
    }

    pub fn spec(&self) -> &WatermarkSpec {
        &self.spec
    }

    /// Overlay the logo on `base`.
    ///
    /// The result is always an RGBA8 working buffer; `color` and `format` of
    /// the input are carried through so the dispatcher can restore the mode.
    pub fn composite(&self, base: ImageAsset) -> ImageAsset {
        let (base_w, base_h) = (base.width, base.height);
        let (logo_w, logo_h) = scaled_logo_size(
            base_w,
            self.logo.width(),
            self.logo.height(),
            self.spec.scale,
        );

        base.map_image(|image| {
            let mut canvas = image.into_rgba8();
            if logo_w == 0 || logo_h == 0 {
                return DynamicImage::ImageRgba8(canvas);
            }

            let mut logo = if (logo_w, logo_h) == self.logo.dimensions() {
                self.logo.as_ref().clone()
            } else {
                imageops::resize(self.logo.as_ref(), logo_w, logo_h, FilterType::Lanczos3)
            };
            fade(&mut logo, self.spec.opacity);

            let (x, y) = placement(
                self.spec.corner,
                (base_w, base_h),
                (logo_w, logo_h),
                self.spec.padding,
            );
            tracing::trace!("  Logo {}x{} at ({}, {})", logo_w, logo_h, x, y);
            blend_over(&mut canvas, &logo, x, y);
            DynamicImage::ImageRgba8(canvas)
        })
    }
}

/// Logo size for a base of width `base_w`: width is `floor(scale * base_w)`,
/// height follows the logo's aspect ratio, truncated.
pub fn scaled_logo_size(base_w: u32, logo_w: u32, logo_h: u32, scale: f32) -> (u32, u32) {
    if logo_w == 0 || logo_h == 0 {
        return (0, 0);
    }
    // The relative nudge absorbs f32 representation error (0.7f32 is 0.69999999).
    let width = (f64::from(scale) * f64::from(base_w) * (1.0 + 1e-7))
        .floor()
        .max(0.0) as u32;
    let height = (f64::from(width) * f64::from(logo_h) / f64::from(logo_w)).floor() as u32;
    (width, height)
}

/// Scale every alpha value to `floor(alpha * opacity)`.
pub fn fade(logo: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for pixel in logo.pixels_mut() {
        pixel[3] = faded_alpha(pixel[3], opacity);
    }
}

/// `floor(alpha * opacity)`.
pub fn faded_alpha(alpha: u8, opacity: f32) -> u8 {
    (f32::from(alpha) * opacity).floor() as u8
}

/// Top-left corner of the logo on the base.
///
/// Offsets may be negative when the logo plus padding does not fit; the
/// overhanging part is clipped by [`blend_over`].
pub fn placement(corner: Corner, base: (u32, u32), logo: (u32, u32), padding: u32) -> (i64, i64) {
    let (bw, bh) = (i64::from(base.0), i64::from(base.1));
    let (lw, lh) = (i64::from(logo.0), i64::from(logo.1));
    let p = i64::from(padding);

    let right = bw - lw - p;
    let bottom = bh - lh - p;
    match corner {
        Corner::TopLeft => (p, p),
        Corner::TopRight => (right, p),
        Corner::BottomLeft => (p, bottom),
        Corner::BottomRight => (right, bottom),
    }
}

/// Source-over `logo` onto `base` with its top-left at `(x, y)`.
///
/// Pixels of the logo that land outside `base` are skipped.
pub fn blend_over(base: &mut RgbaImage, logo: &RgbaImage, x: i64, y: i64) {
    let (bw, bh) = (i64::from(base.width()), i64::from(base.height()));

    for (lx, ly, src) in logo.enumerate_pixels() {
        let bx = x + i64::from(lx);
        let by = y + i64::from(ly);
        if bx < 0 || by < 0 || bx >= bw || by >= bh {
            continue;
        }
        let dst = base.get_pixel_mut(bx as u32, by as u32);
        *dst = over(*src, *dst);
    }
}

/// Porter-Duff source-over of straight-alpha pixels.
///
/// With an opaque destination this is the plain per-channel lerp
/// `src * a + dst * (1 - a)`.
fn over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }

    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (f32::from(src[c]) * sa + f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    // A transparent destination leaves exactly the source alpha.
    out[3] = if dst[3] == 0 {
        src[3]
    } else {
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorMode, SourceFormat};
    use image::{GenericImageView, Rgb, RgbImage};

    fn spec(opacity: f32, scale: f32, padding: u32) -> WatermarkSpec {
        WatermarkSpec {
            logo_path: PathBuf::from("logo.png"),
            opacity,
            scale,
            corner: Corner::BottomRight,
            padding,
        }
    }

    fn solid_logo(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    fn rgb_base(w: u32, h: u32, px: [u8; 3]) -> ImageAsset {
        ImageAsset::new(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px))),
            SourceFormat::Jpeg,
        )
    }

    #[test]
    fn test_scaled_logo_size() {
        assert_eq!(scaled_logo_size(500, 200, 100, 0.2), (100, 50));
        assert_eq!(scaled_logo_size(100, 10, 10, 0.7), (70, 70));
        assert_eq!(scaled_logo_size(3, 10, 10, 0.2), (0, 0));
        assert_eq!(scaled_logo_size(100, 0, 10, 0.5), (0, 0));
        // 33 * 50 / 100 = 16.5, truncated
        assert_eq!(scaled_logo_size(165, 100, 50, 0.2), (33, 16));
    }

    #[test]
    fn test_placement_bottom_right() {
        let (w, h, lw, lh, p) = (500, 400, 100, 50, 20);
        assert_eq!(
            placement(Corner::BottomRight, (w, h), (lw, lh), p),
            (i64::from(w - lw - p), i64::from(h - p - lh))
        );
    }

    #[test]
    fn test_placement_other_corners() {
        assert_eq!(placement(Corner::TopLeft, (500, 400), (100, 50), 20), (20, 20));
        assert_eq!(placement(Corner::TopRight, (500, 400), (100, 50), 20), (380, 20));
        assert_eq!(placement(Corner::BottomLeft, (500, 400), (100, 50), 20), (20, 330));
    }

    #[test]
    fn test_placement_negative_when_logo_too_big() {
        assert_eq!(
            placement(Corner::BottomRight, (30, 30), (25, 25), 20),
            (-15, -15)
        );
    }

    #[test]
    fn test_blend_over_clips_negative_offset() {
        let mut base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let logo = solid_logo(8, 8, [255, 255, 255, 255]);
        blend_over(&mut base, &logo, -4, -4);

        assert_eq!(base.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(base.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
        assert_eq!(base.get_pixel(4, 4), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_blend_over_fully_outside_is_noop() {
        let mut base = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        let before = base.clone();
        blend_over(&mut base, &solid_logo(2, 2, [255, 0, 0, 255]), 10, -10);
        assert_eq!(base, before);
    }

    #[test]
    fn test_full_opacity_opaque_logo_is_identity() {
        let logo = RgbaImage::from_fn(10, 10, |x, y| Rgba([x as u8 * 20, y as u8 * 20, 77, 255]));
        let compositor = Compositor::with_logo(spec(1.0, 0.1, 5), logo.clone());
        let out = compositor.composite(rgb_base(100, 60, [3, 200, 90]));

        // 10x10 logo at (100 - 10 - 5, 60 - 10 - 5) = (85, 45)
        for (lx, ly, px) in logo.enumerate_pixels() {
            assert_eq!(out.image.get_pixel(85 + lx, 45 + ly), *px);
        }
        assert_eq!(out.image.get_pixel(0, 0), Rgba([3, 200, 90, 255]));
    }

    #[test]
    fn test_faded_alpha_is_floor() {
        for opacity in [0.0f32, 0.1, 0.25, 0.5, 0.7, 0.99, 1.0] {
            for alpha in [0u8, 1, 2, 100, 127, 128, 254, 255] {
                let expected = (f32::from(alpha) * opacity).floor() as u8;
                assert_eq!(faded_alpha(alpha, opacity), expected);
            }
        }
        assert_eq!(faded_alpha(255, 0.5), 127);
        assert_eq!(faded_alpha(255, 1.0), 255);
    }

    #[test]
    fn test_composited_alpha_on_transparent_base() {
        let logo = RgbaImage::from_fn(4, 4, |x, y| Rgba([255, 0, 0, (x * 60 + y * 3) as u8]));
        let base = ImageAsset::new(DynamicImage::new_rgba8(40, 40), SourceFormat::Png);

        for opacity in [0.0f32, 0.3, 0.5, 0.8, 1.0] {
            let compositor = Compositor::with_logo(spec(opacity, 0.1, 0), logo.clone());
            let out = compositor.composite(base.clone());
            // 4x4 logo at (36, 36)
            for (lx, ly, px) in logo.enumerate_pixels() {
                let got = out.image.get_pixel(36 + lx, 36 + ly)[3];
                assert_eq!(got, faded_alpha(px[3], opacity), "opacity {opacity}");
            }
        }
    }

    #[test]
    fn test_half_opacity_blend_on_opaque_base() {
        let compositor =
            Compositor::with_logo(spec(0.5, 0.5, 0), solid_logo(2, 2, [255, 255, 255, 255]));
        let out = compositor.composite(rgb_base(4, 4, [0, 0, 0]));

        // alpha 127/255 of white over black
        let px = out.image.get_pixel(3, 3);
        assert_eq!(px, Rgba([127, 127, 127, 255]));
        assert_eq!(out.image.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_zero_opacity_leaves_base() {
        let compositor =
            Compositor::with_logo(spec(0.0, 0.5, 0), solid_logo(2, 2, [255, 0, 0, 255]));
        let out = compositor.composite(rgb_base(8, 8, [10, 20, 30]));
        for (_, _, px) in out.image.pixels() {
            assert_eq!(px, Rgba([10, 20, 30, 255]));
        }
    }

    #[test]
    fn test_logo_larger_than_base_does_not_panic() {
        let compositor =
            Compositor::with_logo(spec(1.0, 1.0, 20), solid_logo(50, 200, [1, 2, 3, 255]));
        let out = compositor.composite(rgb_base(10, 10, [0, 0, 0]));
        assert_eq!(out.image.dimensions(), (10, 10));
    }

    #[test]
    fn test_tiny_base_skips_overlay() {
        let compositor =
            Compositor::with_logo(spec(1.0, 0.2, 0), solid_logo(4, 4, [255, 0, 0, 255]));
        let out = compositor.composite(rgb_base(3, 3, [5, 5, 5]));
        assert_eq!(out.image.get_pixel(2, 2), Rgba([5, 5, 5, 255]));
    }

    #[test]
    fn test_composite_keeps_source_mode_and_cache() {
        let logo = solid_logo(4, 4, [255, 0, 0, 200]);
        let compositor = Compositor::with_logo(spec(0.5, 0.5, 0), logo.clone());
        let spec_before = compositor.spec().clone();

        let out = compositor.composite(rgb_base(16, 16, [0, 0, 0]));
        assert_eq!(out.color, ColorMode::Rgb);
        assert_eq!(out.format, SourceFormat::Jpeg);
        assert!(matches!(out.image, DynamicImage::ImageRgba8(_)));

        assert_eq!(compositor.logo.as_ref(), &logo);
        assert_eq!(compositor.spec(), &spec_before);
    }

    #[test]
    fn test_new_reports_missing_logo() {
        let err = Compositor::new(spec(0.5, 0.2, 20)).unwrap_err();
        assert!(matches!(err, PipelineError::Logo { .. }));
    }
}
