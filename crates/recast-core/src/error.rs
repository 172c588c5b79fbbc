//! Error types module
//!
//! Every failure a conversion can end in is a `ConversionError`. Transcoders raise the
//! narrowest variant they can attach a message to; the coordinator turns whatever it
//! receives into a terminal `ConversionResult::Failure` carrying the matching
//! `ConversionErrorKind`.

use serde::{Deserialize, Serialize};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like unsupported inputs
    Debug,
    /// Warning level - for bad input data the codecs rejected
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the caller and logged
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DECODE_FAILURE")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Kind tag carried by a failed `ConversionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionErrorKind {
    UnsupportedFileType,
    UnsupportedConversion,
    DecodeFailure,
    EncodeFailure,
    EngineInitFailure,
    InternalFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    #[error("{message}")]
    UnsupportedConversion {
        from: String,
        to: String,
        message: String,
    },

    #[error("Failed to decode input: {0}")]
    Decode(String),

    #[error("Failed to encode output: {0}")]
    Encode(String),

    #[error("Codec engine failed to initialize: {0}")]
    EngineInit(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    /// No conversion path from `from` to `to`, with the default message.
    pub fn unsupported_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        let message = format!("Cannot convert {} to {}", from.to_uppercase(), to.to_uppercase());
        ConversionError::UnsupportedConversion { from, to, message }
    }

    /// No conversion path, with a message chosen by the transcoder.
    pub fn unsupported_conversion_with(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConversionError::UnsupportedConversion {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ConversionErrorKind {
        match self {
            ConversionError::UnsupportedFileType { .. } => ConversionErrorKind::UnsupportedFileType,
            ConversionError::UnsupportedConversion { .. } => {
                ConversionErrorKind::UnsupportedConversion
            }
            ConversionError::Decode(_) => ConversionErrorKind::DecodeFailure,
            ConversionError::Encode(_) => ConversionErrorKind::EncodeFailure,
            ConversionError::EngineInit(_) => ConversionErrorKind::EngineInitFailure,
            ConversionError::Internal(_) => ConversionErrorKind::InternalFailure,
        }
    }
}

/// Static metadata for each kind: (error_code, recoverable, suggested_action, log_level).
fn kind_static_metadata(
    kind: ConversionErrorKind,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match kind {
        ConversionErrorKind::UnsupportedFileType => (
            "UNSUPPORTED_FILE_TYPE",
            false,
            Some("Choose a file with a supported extension"),
            LogLevel::Debug,
        ),
        ConversionErrorKind::UnsupportedConversion => (
            "UNSUPPORTED_CONVERSION",
            false,
            Some("Pick a different output format for this file"),
            LogLevel::Debug,
        ),
        ConversionErrorKind::DecodeFailure => (
            "DECODE_FAILURE",
            false,
            Some("Check that the file is not corrupt and matches its extension"),
            LogLevel::Warn,
        ),
        ConversionErrorKind::EncodeFailure => (
            "ENCODE_FAILURE",
            false,
            Some("Try different settings or another output format"),
            LogLevel::Warn,
        ),
        ConversionErrorKind::EngineInitFailure => (
            "ENGINE_INIT_FAILURE",
            true,
            Some("Retry; the codec engine is loaded again on the next request"),
            LogLevel::Error,
        ),
        ConversionErrorKind::InternalFailure => (
            "INTERNAL_FAILURE",
            true,
            Some("Retry the conversion"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for ConversionError {
    fn error_code(&self) -> &'static str {
        kind_static_metadata(self.kind()).0
    }

    fn is_recoverable(&self) -> bool {
        kind_static_metadata(self.kind()).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        kind_static_metadata(self.kind()).2
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        kind_static_metadata(self.kind()).3
    }
}
