use std::sync::Arc;

use async_trait::async_trait;
use recast_core::{Artifact, ConversionError, ConversionSettings, MediaFamily, SourceFile};

use crate::classifier::extension_of;
use crate::codec::{run_staged, ProbeInfo, SharedCodecEngine};
use crate::dimensions::{even_dimensions, resolve};
use crate::progress::ProgressSink;
use crate::traits::Transcoder;

/// Container formats the video family can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoTarget {
    Mp4,
    Mov,
    Mkv,
    WebM,
    Avi,
    Flv,
    Wmv,
}

/// How a target expresses the quality setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateControl {
    /// x264 constant rate factor with a speed preset
    X264,
    /// VP9 constant quality (`-crf` with `-b:v 0`)
    Vp9,
    /// Fixed quantizer scale for the older encoders
    Quantizer,
}

impl VideoTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mp4" => Some(VideoTarget::Mp4),
            "mov" => Some(VideoTarget::Mov),
            "mkv" => Some(VideoTarget::Mkv),
            "webm" => Some(VideoTarget::WebM),
            "avi" => Some(VideoTarget::Avi),
            "flv" => Some(VideoTarget::Flv),
            "wmv" => Some(VideoTarget::Wmv),
            _ => None,
        }
    }

    /// (video encoder, audio encoder)
    fn codecs(self) -> (&'static str, &'static str) {
        match self {
            VideoTarget::Mp4 | VideoTarget::Mov | VideoTarget::Mkv => ("libx264", "aac"),
            VideoTarget::WebM => ("libvpx-vp9", "libopus"),
            VideoTarget::Avi => ("mpeg4", "libmp3lame"),
            VideoTarget::Flv => ("flv", "aac"),
            VideoTarget::Wmv => ("wmv2", "wmav2"),
        }
    }

    fn rate_control(self) -> RateControl {
        match self {
            VideoTarget::Mp4 | VideoTarget::Mov | VideoTarget::Mkv => RateControl::X264,
            VideoTarget::WebM => RateControl::Vp9,
            VideoTarget::Avi | VideoTarget::Flv | VideoTarget::Wmv => RateControl::Quantizer,
        }
    }

    /// FFmpeg arguments for one job, without the engine's global flags.
    ///
    /// Without a requested width or height no scale filter is added and the source
    /// dimensions pass through unchanged, so an odd-sized source may be rejected by the
    /// 4:2:0 encoders. Audio is dropped with `-an` when the probe found no audio stream.
    pub fn build_args(
        self,
        input: &str,
        output: &str,
        settings: &ConversionSettings,
        preset: &str,
        probe: &ProbeInfo,
    ) -> Vec<String> {
        let (video_codec, audio_codec) = self.codecs();
        let mut args: Vec<String> = ["-i", input, "-c:v", video_codec].map(String::from).to_vec();

        match self.rate_control() {
            RateControl::X264 => {
                let crf_value = crf(settings.quality).to_string();
                args.extend(
                    [
                        "-crf",
                        crf_value.as_str(),
                        "-preset",
                        preset,
                        "-pix_fmt",
                        "yuv420p",
                    ]
                    .map(String::from),
                );
            }
            RateControl::Vp9 => {
                let crf_value = crf(settings.quality).to_string();
                args.extend(["-crf", crf_value.as_str(), "-b:v", "0"].map(String::from));
            }
            RateControl::Quantizer => {
                let q = quantizer(settings.quality).to_string();
                args.extend(["-q:v", q.as_str()].map(String::from));
            }
        }

        if let Some(filter) = scale_filter(settings, probe) {
            args.push("-vf".to_string());
            args.push(filter);
        }

        if probe.is_silent() {
            args.push("-an".to_string());
        } else {
            args.extend(["-c:a", audio_codec].map(String::from));
        }

        if matches!(self, VideoTarget::Mp4 | VideoTarget::Mov) {
            args.extend(["-movflags", "+faststart"].map(String::from));
        }

        args.push(output.to_string());
        args
    }
}

/// Constant rate factor: quality 100 maps to 0 (best), quality 1 to 50.
pub fn crf(quality: u8) -> u32 {
    ((100 - quality.clamp(1, 100) as u32) as f64 * 0.51).round() as u32
}

/// `-q:v` for mpeg4/flv/wmv2: 2 (best) to 31.
pub fn quantizer(quality: u8) -> u32 {
    (2.0 + (100 - quality.clamp(1, 100) as u32) as f64 * 29.0 / 99.0).round() as u32
}

/// Scale filter for the requested size, or `None` when no axis is set.
fn scale_filter(settings: &ConversionSettings, probe: &ProbeInfo) -> Option<String> {
    if !settings.has_target_dimensions() {
        return None;
    }

    if let Some((source_width, source_height)) = probe.dimensions() {
        let (width, height) = resolve(
            source_width,
            source_height,
            settings.width,
            settings.height,
            settings.maintain_aspect_ratio,
        );
        let (width, height) = even_dimensions(width, height);
        return Some(format!("scale={}:{}", width, height));
    }

    // Source size unknown: let the filter derive the free axis.
    let even = |v: u32| (v & !1).max(2);
    let filter = match (settings.width, settings.height) {
        (w, 0) if settings.maintain_aspect_ratio => format!("scale={}:-2", even(w)),
        (0, h) if settings.maintain_aspect_ratio => format!("scale=-2:{}", even(h)),
        (w, 0) => format!("scale={}:ih", even(w)),
        (0, h) => format!("scale=iw:{}", even(h)),
        (w, h) if settings.maintain_aspect_ratio => format!(
            "scale={}:{}:force_original_aspect_ratio=decrease:force_divisible_by=2",
            even(w),
            even(h)
        ),
        (w, h) => format!("scale={}:{}", even(w), even(h)),
    };
    Some(filter)
}

pub struct VideoTranscoder {
    engine: Arc<SharedCodecEngine>,
    preset: String,
}

impl VideoTranscoder {
    pub fn new(engine: Arc<SharedCodecEngine>, preset: impl Into<String>) -> Self {
        Self {
            engine,
            preset: preset.into(),
        }
    }
}

#[async_trait]
impl Transcoder for VideoTranscoder {
    fn family(&self) -> MediaFamily {
        MediaFamily::Video
    }

    #[tracing::instrument(skip_all, fields(file = %file.name, to = %target))]
    async fn convert(
        &self,
        file: &SourceFile,
        target: &str,
        settings: &ConversionSettings,
        progress: &ProgressSink,
    ) -> Result<Artifact, ConversionError> {
        let video_target = VideoTarget::parse(target).ok_or_else(|| {
            ConversionError::unsupported_conversion(extension_of(&file.name), target)
        })?;

        let preset = self.preset.as_str();
        let data = run_staged(&self.engine, file, target, progress, |job| {
            video_target.build_args(job.input, job.output, settings, preset, job.probe)
        })
        .await?;

        tracing::debug!(output_size = data.len(), "Video transcoded");
        Ok(Artifact::for_target(data, &file.name, target))
    }
}
