//! FFmpeg-backed codec engine.
//!
//! The engine owns a scratch directory that plays the role of its virtual filesystem:
//! inputs are written into it, FFmpeg runs with it as working directory, and outputs are
//! read back from it. Every staged file is removed when its handle is dropped.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use recast_core::{ConversionError, EngineConfig};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use uuid::Uuid;

use crate::codec::probe::ProbeInfo;
use crate::codec::progress::{fraction, is_input_error, parse_progress_line, ProgressLine};

const ERROR_TAIL_LINES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("FFmpeg not found at '{path}'")]
    NotFound { path: String },

    #[error("FFmpeg at '{path}' is not usable: {reason}")]
    Unusable { path: String, reason: String },

    #[error("Failed to prepare codec workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("FFmpeg could not read the input: {0}")]
    Input(String),

    #[error("FFmpeg failed: {0}")]
    Failed(String),

    #[error("FFmpeg timed out after {0} seconds")]
    Timeout(u64),

    #[error("FFmpeg produced no output")]
    EmptyOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for ConversionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NotFound { .. } | CodecError::Unusable { .. } | CodecError::Workspace(_) => {
                ConversionError::EngineInit(err.to_string())
            }
            CodecError::Input(_) => ConversionError::Decode(err.to_string()),
            CodecError::Failed(_) | CodecError::Timeout(_) | CodecError::EmptyOutput => {
                ConversionError::Encode(err.to_string())
            }
            CodecError::Io(_) => ConversionError::Internal(err.to_string()),
        }
    }
}

/// A file inside the engine workspace, removed on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file_name: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name relative to the workspace, as passed to FFmpeg.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

/// Keep names safe to pass as FFmpeg arguments.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `key=value` lines from `-progress` carry bare identifier keys; diagnostics don't.
fn is_progress_output(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, _)) => {
            !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

pub struct CodecEngine {
    ffmpeg_path: String,
    ffprobe_path: String,
    workspace: TempDir,
    timeout_secs: u64,
    version: String,
}

impl std::fmt::Debug for CodecEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecEngine")
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("workspace", &self.workspace.path())
            .field("version", &self.version)
            .finish()
    }
}

impl CodecEngine {
    /// Verify the FFmpeg binary and create the scratch workspace.
    #[tracing::instrument(skip(config), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %config.ffmpeg_path,
    ))]
    pub async fn load(config: &EngineConfig) -> Result<Self, CodecError> {
        let start = Instant::now();

        let output = Command::new(&config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CodecError::NotFound {
                        path: config.ffmpeg_path.clone(),
                    }
                } else {
                    CodecError::Unusable {
                        path: config.ffmpeg_path.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(CodecError::Unusable {
                path: config.ffmpeg_path.clone(),
                reason: format!(
                    "-version exited with {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown")
            .trim()
            .to_string();

        let mut builder = tempfile::Builder::new();
        builder.prefix("recast-codec-");
        let workspace = match &config.work_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(CodecError::Workspace)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
        .map_err(CodecError::Workspace)?;

        tracing::info!(
            version = %version,
            workspace = %workspace.path().display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Codec engine loaded"
        );

        Ok(Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            workspace,
            timeout_secs: config.codec_timeout_secs.max(1),
            version,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// Reserve a unique workspace name without creating the file.
    pub fn reserve(&self, name: &str) -> StagedFile {
        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize_name(name));
        StagedFile {
            path: self.workspace.path().join(&file_name),
            file_name,
        }
    }

    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<StagedFile, CodecError> {
        let staged = self.reserve(name);
        tokio::fs::write(staged.path(), data).await?;
        Ok(staged)
    }

    pub async fn read_file(&self, file: &StagedFile) -> Result<Vec<u8>, CodecError> {
        match tokio::fs::read(file.path()).await {
            Ok(data) if data.is_empty() => Err(CodecError::EmptyOutput),
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CodecError::EmptyOutput),
            Err(e) => Err(CodecError::Io(e)),
        }
    }

    /// Probe a staged input with ffprobe.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
    ))]
    pub async fn probe(&self, file: &StagedFile) -> Result<ProbeInfo, CodecError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(file.path())
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(CodecError::Input(format!(
                "ffprobe exited with {:?}",
                output.status.code()
            )));
        }

        ProbeInfo::parse(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| CodecError::Input(format!("{:#}", e)))
    }

    /// Run FFmpeg in the workspace with `args`.
    ///
    /// `on_fraction` receives 0.0..=1.0 as output time advances against `duration_secs`.
    #[tracing::instrument(skip(self, args, on_fraction), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
    ))]
    pub async fn exec<F>(
        &self,
        args: &[String],
        duration_secs: Option<f64>,
        on_fraction: F,
    ) -> Result<(), CodecError>
    where
        F: Fn(f64) + Send + Sync,
    {
        let start = Instant::now();
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-nostdin",
                "-y",
                "-loglevel",
                "error",
                "-nostats",
                "-progress",
                "pipe:2",
            ])
            .args(args)
            .current_dir(self.workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CodecError::NotFound {
                        path: self.ffmpeg_path.clone(),
                    }
                } else {
                    CodecError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CodecError::Io(std::io::Error::other("ffmpeg stderr not captured")))?;
        let mut reader = BufReader::new(stderr).lines();

        let run = async {
            let mut error_lines: VecDeque<String> = VecDeque::with_capacity(ERROR_TAIL_LINES);

            while let Some(line) = reader.next_line().await? {
                match parse_progress_line(&line) {
                    Some(ProgressLine::OutTime(secs)) => {
                        if let Some(f) = fraction(secs, duration_secs) {
                            on_fraction(f);
                        }
                    }
                    Some(ProgressLine::End) => on_fraction(1.0),
                    None if is_progress_output(&line) || line.trim().is_empty() => {}
                    None => {
                        if error_lines.len() == ERROR_TAIL_LINES {
                            error_lines.pop_front();
                        }
                        error_lines.push_back(line);
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_lines))
        };

        let outcome = timeout(Duration::from_secs(self.timeout_secs), run).await;
        let (status, error_lines) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(CodecError::Timeout(self.timeout_secs));
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            let detail = if error_lines.is_empty() {
                format!("exited with {:?}", status.code())
            } else {
                error_lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
            };
            tracing::debug!(duration_ms = duration_ms, detail = %detail, "ffmpeg failed");

            return if error_lines.iter().any(|l| is_input_error(l)) {
                Err(CodecError::Input(detail))
            } else {
                Err(CodecError::Failed(detail))
            };
        }

        tracing::debug!(duration_ms = duration_ms, "ffmpeg finished");
        Ok(())
    }
}

/// Lazily loaded engine shared by the audio and video transcoders.
///
/// Loading happens at most once at a time; a failed load leaves the cell empty so the
/// next request tries again.
pub struct SharedCodecEngine {
    config: EngineConfig,
    engine: OnceCell<Arc<CodecEngine>>,
}

impl SharedCodecEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    pub async fn get(&self) -> Result<Arc<CodecEngine>, CodecError> {
        self.engine
            .get_or_try_init(|| async {
                CodecEngine::load(&self.config).await.map(Arc::new).map_err(|e| {
                    tracing::warn!(error = %e, "Codec engine failed to load");
                    e
                })
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("input.mp4"), "input.mp4");
        assert_eq!(sanitize_name("my clip;rm -rf.mov"), "my_clip_rm_-rf.mov");
    }

    #[test]
    fn test_progress_output_detection() {
        assert!(is_progress_output("frame=120"));
        assert!(is_progress_output("stream_0_0_q=28.0"));
        assert!(!is_progress_output("[libx264 @ 0x55] width not divisible by 2 (401x300)"));
        assert!(!is_progress_output("Error opening input file input.mp4."));
    }

    #[test]
    fn test_error_mapping() {
        let err: ConversionError = CodecError::NotFound {
            path: "/nope/ffmpeg".into(),
        }
        .into();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::EngineInitFailure);

        let err: ConversionError = CodecError::Input("moov atom not found".into()).into();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::DecodeFailure);

        let err: ConversionError = CodecError::Failed("Unknown encoder".into()).into();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::EncodeFailure);

        let err: ConversionError = CodecError::Timeout(5).into();
        assert_eq!(err.kind(), recast_core::ConversionErrorKind::EncodeFailure);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let shared = SharedCodecEngine::new(EngineConfig {
            ffmpeg_path: "/definitely/not/here/ffmpeg".to_string(),
            ..Default::default()
        });

        let first = shared.get().await.unwrap_err();
        assert!(matches!(first, CodecError::NotFound { .. }));
        assert!(!shared.is_loaded());

        let second = shared.get().await.unwrap_err();
        assert!(matches!(second, CodecError::NotFound { .. }));
        assert!(!shared.is_loaded());
    }

    #[tokio::test]
    async fn test_staged_files_are_removed_on_drop() {
        let engine = match CodecEngine::load(&EngineConfig::default()).await {
            Ok(engine) => engine,
            Err(_) => return, // ffmpeg not installed
        };

        let staged = engine.write_file("input.wav", b"RIFF").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.starts_with(engine.workspace()));
        drop(staged);
        assert!(!path.exists());
    }
}
