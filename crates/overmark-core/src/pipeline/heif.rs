//! HEIC/HEIF codec bridge.
//!
//! With the `heic` feature (on by default, with libheif built from source by
//! `heic-bundled`) libheif is used for both directions. Without it, decoding
//! reports the format as unsupported and encoding fails, which routes HEIC
//! outputs through the JPEG fallback. The same fallback covers a libheif
//! that was built without an HEVC encoder plugin.

use image::DynamicImage;

/// Whether this build can read and write HEIC.
pub const fn is_available() -> bool {
    cfg!(feature = "heic")
}

#[cfg(feature = "heic")]
mod codec {
    use image::{DynamicImage, RgbImage, RgbaImage};
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    /// Decode the primary image. libheif applies the container's rotation and
    /// mirror properties, so the result is already upright.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, String> {
        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| e.to_string())?;
        let handle = ctx.primary_image_handle().map_err(|e| e.to_string())?;
        let has_alpha = handle.has_alpha_channel();
        let chroma = if has_alpha {
            RgbChroma::Rgba
        } else {
            RgbChroma::Rgb
        };

        let image = lib_heif
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| e.to_string())?;
        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| "decoded image has no interleaved plane".to_string())?;

        let channels: usize = if has_alpha { 4 } else { 3 };
        let row_len = plane.width as usize * channels;
        let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let decoded = if has_alpha {
            RgbaImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgb8)
        };
        decoded.ok_or_else(|| "plane size does not match image dimensions".to_string())
    }

    /// Encode losslessly as HEVC-in-HEIF.
    pub fn encode(image: &DynamicImage) -> Result<Vec<u8>, String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut heif_image =
            Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).map_err(|e| e.to_string())?;
        heif_image
            .create_plane(Channel::Interleaved, width, height, 8)
            .map_err(|e| e.to_string())?;
        {
            let planes = heif_image.planes_mut();
            let plane = planes
                .interleaved
                .ok_or_else(|| "encoder image has no interleaved plane".to_string())?;
            let row_len = width as usize * 3;
            for (dst, src) in plane
                .data
                .chunks_mut(plane.stride)
                .zip(rgb.as_raw().chunks(row_len))
            {
                dst[..row_len].copy_from_slice(src);
            }
        }

        let lib_heif = LibHeif::new();
        let mut encoder = lib_heif
            .encoder_for_format(CompressionFormat::Hevc)
            .map_err(|e| e.to_string())?;
        encoder
            .set_quality(EncoderQuality::LossLess)
            .map_err(|e| e.to_string())?;

        let mut ctx = HeifContext::new().map_err(|e| e.to_string())?;
        ctx.encode_image(&heif_image, &mut encoder, None)
            .map_err(|e| e.to_string())?;
        ctx.write_to_bytes().map_err(|e| e.to_string())
    }
}

/// Decode HEIC/HEIF bytes into an upright buffer.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, String> {
    #[cfg(feature = "heic")]
    {
        codec::decode(bytes)
    }
    #[cfg(not(feature = "heic"))]
    {
        let _ = bytes;
        Err("built without HEIC support".to_string())
    }
}

/// Encode a buffer as HEIC.
pub fn encode(image: &DynamicImage) -> Result<Vec<u8>, String> {
    #[cfg(feature = "heic")]
    {
        codec::encode(image)
    }
    #[cfg(not(feature = "heic"))]
    {
        let _ = image;
        Err("built without HEIC support".to_string())
    }
}
