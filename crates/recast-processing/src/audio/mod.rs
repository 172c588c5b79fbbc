//! Audio transcoding through the shared codec engine

pub mod transcoder;

pub use transcoder::{AudioTarget, AudioTranscoder};
