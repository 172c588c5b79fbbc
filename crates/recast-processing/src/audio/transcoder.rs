use std::sync::Arc;

use async_trait::async_trait;
use recast_core::{Artifact, ConversionError, ConversionSettings, MediaFamily, SourceFile};

use crate::classifier::extension_of;
use crate::codec::{run_staged, SharedCodecEngine};
use crate::progress::ProgressSink;
use crate::traits::Transcoder;

const MIN_BITRATE_KBPS: u32 = 8;

/// Formats the audio family can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTarget {
    Mp3,
    Wav,
    Aac,
    Ogg,
    Flac,
    M4a,
}

impl AudioTarget {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mp3" => Some(AudioTarget::Mp3),
            "wav" => Some(AudioTarget::Wav),
            "aac" => Some(AudioTarget::Aac),
            "ogg" => Some(AudioTarget::Ogg),
            "flac" => Some(AudioTarget::Flac),
            "m4a" => Some(AudioTarget::M4a),
            _ => None,
        }
    }

    fn codec(self) -> &'static str {
        match self {
            AudioTarget::Mp3 => "libmp3lame",
            AudioTarget::Wav => "pcm_s16le",
            AudioTarget::Aac | AudioTarget::M4a => "aac",
            AudioTarget::Ogg => "libvorbis",
            AudioTarget::Flac => "flac",
        }
    }

    /// FFmpeg arguments for one job, without the engine's global flags.
    ///
    /// Lossy targets get a bitrate from quality, flac gets the compression level, and wav
    /// takes neither.
    pub fn build_args(self, input: &str, output: &str, settings: &ConversionSettings) -> Vec<String> {
        let mut args: Vec<String> = ["-i", input, "-vn", "-c:a", self.codec()]
            .map(String::from)
            .to_vec();

        match self {
            AudioTarget::Wav => {}
            AudioTarget::Flac => {
                args.push("-compression_level".to_string());
                args.push(settings.compression_level.min(12).to_string());
            }
            AudioTarget::Mp3 | AudioTarget::Aac | AudioTarget::Ogg | AudioTarget::M4a => {
                args.push("-b:a".to_string());
                args.push(format!("{}k", bitrate_kbps(settings.quality)));
            }
        }

        args.push(output.to_string());
        args
    }
}

/// Target bitrate: quality 0-100 onto 0-320 kbps, floored at 8.
pub fn bitrate_kbps(quality: u8) -> u32 {
    ((quality.min(100) as f64 * 3.2).round() as u32).max(MIN_BITRATE_KBPS)
}

pub struct AudioTranscoder {
    engine: Arc<SharedCodecEngine>,
}

impl AudioTranscoder {
    pub fn new(engine: Arc<SharedCodecEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Transcoder for AudioTranscoder {
    fn family(&self) -> MediaFamily {
        MediaFamily::Audio
    }

    #[tracing::instrument(skip_all, fields(file = %file.name, to = %target))]
    async fn convert(
        &self,
        file: &SourceFile,
        target: &str,
        settings: &ConversionSettings,
        progress: &ProgressSink,
    ) -> Result<Artifact, ConversionError> {
        let audio_target = AudioTarget::parse(target).ok_or_else(|| {
            ConversionError::unsupported_conversion(extension_of(&file.name), target)
        })?;

        let data = run_staged(&self.engine, file, target, progress, |job| {
            audio_target.build_args(job.input, job.output, settings)
        })
        .await?;

        tracing::debug!(output_size = data.len(), "Audio transcoded");
        Ok(Artifact::for_target(data, &file.name, target))
    }
}
