//! Recast Infrastructure Library
//!
//! Shared infrastructure for processes embedding the conversion engine:
//! - Tracing subscriber initialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};
