//! Configuration module
//!
//! Engine configuration: codec binary locations, scratch directory, timeouts and
//! rasterization fallbacks.

use std::env;
use std::path::PathBuf;

// Common constants
const FFMPEG_PATH: &str = "ffmpeg";
const FFPROBE_PATH: &str = "ffprobe";
const CODEC_TIMEOUT_SECS: u64 = 3600;
const VIDEO_PRESET: &str = "medium";
const SVG_FALLBACK_WIDTH: u32 = 800;
const SVG_FALLBACK_HEIGHT: u32 = 600;

const VIDEO_PRESETS: [&str; 9] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Parent directory of the codec engine's scratch workspace. `None` = system temp dir.
    pub work_dir: Option<PathBuf>,
    pub codec_timeout_secs: u64,
    /// x264 preset for mp4/mov/mkv output
    pub video_preset: String,
    /// Raster size for SVG inputs that declare no usable size
    pub svg_fallback_width: u32,
    pub svg_fallback_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: FFMPEG_PATH.to_string(),
            ffprobe_path: FFPROBE_PATH.to_string(),
            work_dir: None,
            codec_timeout_secs: CODEC_TIMEOUT_SECS,
            video_preset: VIDEO_PRESET.to_string(),
            svg_fallback_width: SVG_FALLBACK_WIDTH,
            svg_fallback_height: SVG_FALLBACK_HEIGHT,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let video_preset = env::var("VIDEO_PRESET")
            .unwrap_or_else(|_| VIDEO_PRESET.to_string())
            .to_lowercase();
        if !VIDEO_PRESETS.contains(&video_preset.as_str()) {
            return Err(anyhow::anyhow!(
                "VIDEO_PRESET must be one of: {}",
                VIDEO_PRESETS.join(", ")
            ));
        }

        let codec_timeout_secs = env::var("CODEC_TIMEOUT_SECS")
            .unwrap_or_else(|_| CODEC_TIMEOUT_SECS.to_string())
            .parse()
            .unwrap_or(CODEC_TIMEOUT_SECS);
        if codec_timeout_secs == 0 {
            return Err(anyhow::anyhow!("CODEC_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(Self {
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| FFMPEG_PATH.to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| FFPROBE_PATH.to_string()),
            work_dir: env::var("RECAST_WORK_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            codec_timeout_secs,
            video_preset,
            svg_fallback_width: env::var("SVG_FALLBACK_WIDTH")
                .unwrap_or_else(|_| SVG_FALLBACK_WIDTH.to_string())
                .parse()
                .ok()
                .filter(|w| *w > 0)
                .unwrap_or(SVG_FALLBACK_WIDTH),
            svg_fallback_height: env::var("SVG_FALLBACK_HEIGHT")
                .unwrap_or_else(|_| SVG_FALLBACK_HEIGHT.to_string())
                .parse()
                .ok()
                .filter(|h| *h > 0)
                .unwrap_or(SVG_FALLBACK_HEIGHT),
        })
    }
}
