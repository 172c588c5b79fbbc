//! Tracing initialization
//!
//! Installs the process-wide `tracing` subscriber used by the engine crates.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat};
