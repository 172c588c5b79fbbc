//! Image transcoder - raster and SVG inputs to raster outputs.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use recast_core::{
    Artifact, ConversionError, ConversionSettings, EngineConfig, MediaFamily, SourceFile,
};

use crate::classifier::extension_of;
use crate::compression::ImageCompressor;
use crate::image::resample::ImageResample;
use crate::image::svg::SvgRasterizer;
use crate::progress::ProgressSink;
use crate::traits::Transcoder;

/// Raster formats the image family can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl ImageTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jpg" | "jpeg" => Some(ImageTarget::Jpeg),
            "png" => Some(ImageTarget::Png),
            "webp" => Some(ImageTarget::WebP),
            "gif" => Some(ImageTarget::Gif),
            "bmp" => Some(ImageTarget::Bmp),
            "tiff" => Some(ImageTarget::Tiff),
            _ => None,
        }
    }

    /// PNG deflate effort from the 0-9 compression level
    fn png_compression(level: u8) -> CompressionType {
        match level {
            0..=2 => CompressionType::Fast,
            3..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }

    /// Primary encode. JPEG honors quality directly; WebP is written lossless here and
    /// only becomes lossy through the secondary pass.
    pub fn encode(self, img: &DynamicImage, settings: &ConversionSettings) -> Result<Bytes, ConversionError> {
        let mut buffer = Cursor::new(Vec::new());

        let result = match self {
            ImageTarget::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, settings.quality.clamp(1, 100));
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
            }
            ImageTarget::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    Self::png_compression(settings.compression_level),
                    PngFilter::Adaptive,
                );
                DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)
            }
            ImageTarget::WebP => {
                let encoder = WebPEncoder::new_lossless(&mut buffer);
                DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)
            }
            ImageTarget::Gif => {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buffer, ImageFormat::Gif)
            }
            ImageTarget::Bmp => {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buffer, ImageFormat::Bmp)
            }
            ImageTarget::Tiff => {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buffer, ImageFormat::Tiff)
            }
        };

        result.map_err(|e| ConversionError::Encode(format!("{:?} encoder failed: {}", self, e)))?;

        let data = buffer.into_inner();
        if data.is_empty() {
            return Err(ConversionError::Encode(format!("{:?} encoder produced no output", self)));
        }
        Ok(Bytes::from(data))
    }
}

pub struct ImageTranscoder {
    svg: Arc<SvgRasterizer>,
}

impl ImageTranscoder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            svg: Arc::new(SvgRasterizer::new(
                config.svg_fallback_width,
                config.svg_fallback_height,
            )),
        }
    }

    pub fn decode(data: &[u8]) -> Result<DynamicImage, ConversionError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ConversionError::Decode(format!("Failed to read image: {}", e)))?
            .decode()
            .map_err(|e| ConversionError::Decode(format!("Failed to decode image: {}", e)))
    }
}

/// Run CPU-bound image work off the async runtime.
async fn blocking<T, F>(stage: &'static str, f: F) -> Result<T, ConversionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConversionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConversionError::Internal(format!("Image {} task failed: {}", stage, e)))?
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    fn family(&self) -> MediaFamily {
        MediaFamily::Image
    }

    #[tracing::instrument(skip_all, fields(file = %file.name, to = %target))]
    async fn convert(
        &self,
        file: &SourceFile,
        target: &str,
        settings: &ConversionSettings,
        progress: &ProgressSink,
    ) -> Result<Artifact, ConversionError> {
        let source_ext = extension_of(&file.name);
        let image_target = ImageTarget::parse(target)
            .ok_or_else(|| ConversionError::unsupported_conversion(&source_ext, target))?;
        let settings = *settings;

        progress.report(20);

        let data = file.data.clone();
        let decoded = if source_ext == "svg" {
            // Rendered straight at the output size instead of rasterizing then resampling.
            let svg = self.svg.clone();
            blocking("rasterize", move || {
                svg.rasterize(&data, settings.width, settings.height, settings.maintain_aspect_ratio)
            })
            .await?
        } else {
            blocking("decode", move || ImageTranscoder::decode(&data)).await?
        };
        tracing::debug!(width = decoded.width(), height = decoded.height(), "Image decoded");
        progress.report(40);

        let resampled = blocking("resample", move || {
            let (width, height) = ImageResample::target_dimensions(
                &decoded,
                settings.width,
                settings.height,
                settings.maintain_aspect_ratio,
            );
            Ok(ImageResample::resample(decoded, width, height))
        })
        .await?;
        progress.report(70);

        let resampled = Arc::new(resampled);
        let encoded = {
            let img = resampled.clone();
            blocking("encode", move || image_target.encode(&img, &settings)).await?
        };
        progress.report(90);

        let output = if ImageCompressor::applies(target, settings.quality) {
            let img = resampled.clone();
            let format = target.to_string();
            let primary = encoded.clone();
            // A failing pass falls back to the primary bytes, so a join error does too.
            tokio::task::spawn_blocking(move || {
                ImageCompressor::compress_or_passthrough(&img, &format, settings.quality, primary)
            })
            .await
            .unwrap_or(encoded)
        } else {
            encoded
        };

        tracing::debug!(bytes = output.len(), "Image encoded");
        Ok(Artifact::for_target(output, &file.name, target))
    }
}
