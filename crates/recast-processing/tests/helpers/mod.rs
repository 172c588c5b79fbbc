//! Shared helpers for the recast-processing integration tests.
//!
//! Run with: `cargo test -p recast-processing`. Tests that need FFmpeg return early when
//! no `ffmpeg` binary is on the PATH.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::{Arc, Mutex};

use recast_infra::{init_telemetry, LogFormat};
use recast_processing::ProgressSink;

/// Install a subscriber once per test binary; later calls are no-ops.
pub fn init_tracing() {
    let _ = init_telemetry(Some("recast=debug"), LogFormat::Pretty);
}

/// Whether `ffmpeg` and `ffprobe` can be executed.
pub fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|bin| {
        std::process::Command::new(bin)
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    })
}

/// Sink recording every value it receives.
pub fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        ProgressSink::new(move |p| seen.lock().unwrap().push(p))
    };
    (sink, seen)
}

/// Assert `values` never decreases and stays within 0..=100.
pub fn assert_monotonic(values: &[u8]) {
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "progress regressed: {:?}", values);
    }
    assert!(values.iter().all(|p| *p <= 100), "progress above 100: {:?}", values);
}
