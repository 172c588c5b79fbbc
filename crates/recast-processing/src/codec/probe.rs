//! ffprobe output parsing.

use anyhow::{Context, Result};
use serde::Deserialize;

/// What the engine needs to know about an input before encoding it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeInfo {
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
}

impl ProbeInfo {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// True when the probe read the input and found no audio stream. An empty probe, as
    /// left by a failed ffprobe run, is never silent.
    pub fn is_silent(&self) -> bool {
        let read_streams = self.duration_secs.is_some() || self.dimensions().is_some();
        read_streams && !self.has_audio
    }

    /// Parse `ffprobe -print_format json -show_format -show_streams` output.
    pub fn parse(output: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            #[serde(default)]
            disposition: Option<ProbeDisposition>,
        }

        #[derive(Deserialize)]
        struct ProbeDisposition {
            #[serde(default)]
            attached_pic: u8,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).context("Failed to parse ffprobe output")?;

        let duration_secs = probe
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0);

        // Cover art shows up as a video stream; it is not the picture being converted.
        let video_stream = probe.streams.iter().find(|s| {
            s.codec_type.as_deref() == Some("video")
                && s.disposition.as_ref().map_or(true, |d| d.attached_pic == 0)
        });

        let has_audio = probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(ProbeInfo {
            duration_secs,
            width: video_stream.and_then(|s| s.width),
            height: video_stream.and_then(|s| s.height),
            has_audio,
        })
    }
}
