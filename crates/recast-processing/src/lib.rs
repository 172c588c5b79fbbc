//! Recast Conversion Engine
//!
//! This crate classifies input files into media families, routes each conversion request
//! to the transcoder for its family and reports monotonic progress while it runs.

pub mod classifier;
pub mod coordinator;
pub mod dimensions;
pub mod progress;
pub mod traits;

#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "codec")]
pub mod codec;

#[cfg(feature = "video")]
pub mod video;

#[cfg(feature = "audio")]
pub mod audio;

#[cfg(feature = "document")]
pub mod document;

// Re-export commonly used types
pub use classifier::classify;
pub use coordinator::ConversionCoordinator;
pub use dimensions::resolve;
pub use progress::ProgressSink;
pub use traits::Transcoder;

#[cfg(feature = "image")]
pub use self::image::ImageTranscoder;

#[cfg(feature = "codec")]
pub use codec::{CodecEngine, SharedCodecEngine};

#[cfg(feature = "video")]
pub use video::VideoTranscoder;

#[cfg(feature = "audio")]
pub use audio::AudioTranscoder;

#[cfg(feature = "document")]
pub use document::DocumentTranscoder;
