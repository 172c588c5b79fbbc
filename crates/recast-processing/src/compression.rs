//! Secondary compression pass for lossy image targets.
//!
//! After the primary encode, JPEG and WebP outputs are re-encoded with mozjpeg or libwebp
//! at the requested quality. The smaller of the two encodings wins. A failing pass never
//! fails the request: the primary bytes are returned instead.

use anyhow::{anyhow, Result};
use bytes::Bytes;
use image::{DynamicImage, GenericImageView};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Lossy formats the secondary pass knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossyFormat {
    Jpeg,
    WebP,
}

impl LossyFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(LossyFormat::Jpeg),
            "webp" => Some(LossyFormat::WebP),
            _ => None,
        }
    }
}

/// Main compression service
pub struct ImageCompressor;

impl ImageCompressor {
    /// Whether a secondary pass runs for `format` at `quality`.
    pub fn applies(format: &str, quality: u8) -> bool {
        quality < 100 && LossyFormat::parse(format).is_some()
    }

    /// Compress image with specified format and quality (1-100)
    pub fn compress(img: &DynamicImage, format: LossyFormat, quality: u8) -> Result<Bytes> {
        match format {
            LossyFormat::Jpeg => Self::compress_jpeg(img, quality),
            LossyFormat::WebP => Self::compress_webp(img, quality),
        }
    }

    /// Run the secondary pass, keeping whichever of `primary` and the recompressed bytes
    /// is smaller. Any error or panic in the encoder yields `primary` unchanged.
    pub fn compress_or_passthrough(
        img: &DynamicImage,
        format: &str,
        quality: u8,
        primary: Bytes,
    ) -> Bytes {
        let Some(lossy) = LossyFormat::parse(format) else {
            return primary;
        };

        let attempt = catch_unwind(AssertUnwindSafe(|| Self::compress(img, lossy, quality)));

        match attempt {
            Ok(Ok(compressed)) if !compressed.is_empty() && compressed.len() < primary.len() => {
                tracing::debug!(
                    format = format,
                    primary_bytes = primary.len(),
                    compressed_bytes = compressed.len(),
                    "Secondary compression reduced output"
                );
                compressed
            }
            Ok(Ok(compressed)) => {
                tracing::debug!(
                    format = format,
                    primary_bytes = primary.len(),
                    compressed_bytes = compressed.len(),
                    "Secondary compression did not reduce output, keeping primary encoding"
                );
                primary
            }
            Ok(Err(e)) => {
                tracing::warn!(format = format, error = %e, "Secondary compression failed, using primary encoding");
                primary
            }
            Err(_) => {
                tracing::warn!(format = format, "Secondary compression panicked, using primary encoding");
                primary
            }
        }
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1, 100) as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to lossy WebP using libwebp
    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();

        // Convert to RGBA for WebP encoding
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.clamp(1, 100) as f32);

        if webp_data.is_empty() {
            return Err(anyhow!("libwebp produced no output"));
        }

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}
