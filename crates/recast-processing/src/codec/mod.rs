//! Shared codec engine used by the video and audio transcoders.
//!
//! One FFmpeg-backed engine per coordinator. It is loaded lazily on the first audio or
//! video request, kept for the rest of the session, and loaded again on the next request
//! if loading failed.

pub mod engine;
pub mod probe;
pub mod progress;
pub mod staging;

pub use engine::{CodecEngine, CodecError, SharedCodecEngine, StagedFile};
pub use probe::ProbeInfo;
pub use progress::{parse_progress_line, ProgressLine};
pub use staging::{run_staged, StagedJob};
