//! Core traits for conversion
//!
//! Every media family is converted by one `Transcoder`. The coordinator only sees this
//! interface, so families never share behavior beyond `convert`.

use async_trait::async_trait;
use recast_core::{Artifact, ConversionError, ConversionSettings, MediaFamily, SourceFile};

use crate::progress::ProgressSink;

/// Converts files of a single media family.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Family this transcoder is registered for
    fn family(&self) -> MediaFamily;

    /// Convert `file` to `target` (lowercase token, no leading dot).
    ///
    /// Progress is reported through `progress`; values above 99 are held back until the
    /// coordinator marks the request complete.
    async fn convert(
        &self,
        file: &SourceFile,
        target: &str,
        settings: &ConversionSettings,
        progress: &ProgressSink,
    ) -> Result<Artifact, ConversionError>;
}
