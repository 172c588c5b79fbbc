//! Recast Core Library
//!
//! This crate provides the domain models, error taxonomy, format tables and configuration
//! shared by the conversion engine crates.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{ConversionError, ConversionErrorKind, ErrorMetadata, LogLevel};
pub use formats::{mime_type_for, output_file_name, MediaFamily};
pub use models::{
    Artifact, ConversionRequest, ConversionResult, ConversionSettings, SourceFile,
};
