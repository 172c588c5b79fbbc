//! Common request flow for engine-backed transcoders.

use recast_core::{ConversionError, SourceFile};

use crate::classifier::extension_of;
use crate::codec::engine::SharedCodecEngine;
use crate::codec::probe::ProbeInfo;
use crate::progress::ProgressSink;

const LOADED: u8 = 30;
const SETUP: u8 = 50;
const ENCODE_END: u8 = 90;
const READ_BACK: u8 = 95;

/// File names inside the engine workspace for one job
#[derive(Debug, Clone, Copy)]
pub struct StagedJob<'a> {
    pub input: &'a str,
    pub output: &'a str,
    pub probe: &'a ProbeInfo,
}

/// Load the engine, stage `file`, run the arguments built by `build_args`, and return the
/// output bytes.
///
/// Progress: 30 once the engine is loaded, 50 after staging, 50-90 while encoding, 95 after
/// the output is read back. Staged files are removed on every exit path.
pub async fn run_staged<B>(
    shared: &SharedCodecEngine,
    file: &SourceFile,
    target: &str,
    progress: &ProgressSink,
    build_args: B,
) -> Result<Vec<u8>, ConversionError>
where
    B: FnOnce(StagedJob<'_>) -> Vec<String> + Send,
{
    let engine = shared.get().await?;
    progress.report(LOADED);

    let input = engine
        .write_file(&format!("input.{}", extension_of(&file.name)), &file.data)
        .await?;
    let output = engine.reserve(&format!("output.{}", target));

    let probe = match engine.probe(&input).await {
        Ok(probe) => probe,
        Err(e) => {
            // FFmpeg reports unreadable input itself; without a probe only progress
            // granularity and source dimensions are lost.
            tracing::debug!(error = %e, "Probe failed, continuing without stream info");
            ProbeInfo::default()
        }
    };

    let args = build_args(StagedJob {
        input: input.file_name(),
        output: output.file_name(),
        probe: &probe,
    });
    progress.report(SETUP);
    tracing::debug!(
        engine_version = %engine.version(),
        duration_secs = ?probe.duration_secs,
        has_audio = probe.has_audio,
        "Running codec job"
    );

    engine
        .exec(&args, probe.duration_secs, |f| {
            progress.report_fraction(SETUP, ENCODE_END, f)
        })
        .await?;

    let data = engine.read_file(&output).await?;
    progress.report(READ_BACK);

    Ok(data)
}
