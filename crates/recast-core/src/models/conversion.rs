use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, ConversionErrorKind};
use crate::formats::{mime_type_for, output_file_name};

const DEFAULT_QUALITY: u8 = 80;
const DEFAULT_COMPRESSION_LEVEL: u8 = 6;
const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Input file: a name (used for classification) and its bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// User conversion settings. Read-only input to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// 1-100
    pub quality: u8,
    /// 0 = keep source width
    pub width: u32,
    /// 0 = keep source height
    pub height: u32,
    pub maintain_aspect_ratio: bool,
    /// 0-9
    pub compression_level: u8,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            width: 0,
            height: 0,
            maintain_aspect_ratio: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ConversionSettings {
    /// Copy with quality clamped to 1..=100 and compression level to 0..=9.
    pub fn normalized(&self) -> Self {
        Self {
            quality: self.quality.clamp(1, 100),
            compression_level: self.compression_level.min(MAX_COMPRESSION_LEVEL),
            ..*self
        }
    }

    pub fn has_target_dimensions(&self) -> bool {
        self.width > 0 || self.height > 0
    }
}

/// One file to convert. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub file: SourceFile,
    pub target_format: String,
    pub settings: ConversionSettings,
}

impl ConversionRequest {
    pub fn new(file: SourceFile, target_format: impl Into<String>, settings: ConversionSettings) -> Self {
        Self {
            file,
            target_format: target_format.into(),
            settings,
        }
    }

    /// Target token lowercased with any leading `.` removed.
    pub fn normalized_target(&self) -> String {
        self.target_format
            .trim()
            .trim_start_matches('.')
            .to_lowercase()
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub data: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

impl Artifact {
    /// Artifact named after `source_name` with the media type of `target_format`.
    pub fn for_target(data: impl Into<Bytes>, source_name: &str, target_format: &str) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type_for(target_format).to_string(),
            file_name: output_file_name(source_name, target_format),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Terminal outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success {
        artifact: Artifact,
    },
    Failure {
        kind: ConversionErrorKind,
        message: String,
    },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            ConversionResult::Success { artifact } => Some(artifact),
            ConversionResult::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ConversionErrorKind> {
        match self {
            ConversionResult::Success { .. } => None,
            ConversionResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<ConversionError> for ConversionResult {
    fn from(err: ConversionError) -> Self {
        ConversionResult::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Result<Artifact, ConversionError>> for ConversionResult {
    fn from(result: Result<Artifact, ConversionError>) -> Self {
        match result {
            Ok(artifact) => ConversionResult::Success { artifact },
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = ConversionSettings::default();
        assert_eq!(settings.quality, 80);
        assert_eq!(settings.width, 0);
        assert_eq!(settings.height, 0);
        assert!(settings.maintain_aspect_ratio);
        assert_eq!(settings.compression_level, 6);
        assert!(!settings.has_target_dimensions());
    }

    #[test]
    fn test_settings_normalized() {
        let settings = ConversionSettings {
            quality: 0,
            compression_level: 12,
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.quality, 1);
        assert_eq!(settings.compression_level, 9);

        let settings = ConversionSettings {
            quality: 250,
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.quality, 100);
    }

    #[test]
    fn test_settings_camel_case_with_defaults() {
        let settings: ConversionSettings =
            serde_json::from_str(r#"{"quality": 55, "maintainAspectRatio": false}"#).unwrap();
        assert_eq!(settings.quality, 55);
        assert!(!settings.maintain_aspect_ratio);
        assert_eq!(settings.compression_level, 6);
    }

    #[test]
    fn test_normalized_target() {
        let request = ConversionRequest::new(
            SourceFile::new("a.png", Vec::new()),
            ".WebP",
            ConversionSettings::default(),
        );
        assert_eq!(request.normalized_target(), "webp");
    }

    #[test]
    fn test_failure_result_from_error() {
        let result: ConversionResult = ConversionError::Decode("truncated".into()).into();
        assert!(!result.is_success());
        assert!(result.artifact().is_none());
        assert_eq!(result.error_kind(), Some(ConversionErrorKind::DecodeFailure));
    }

    #[test]
    fn test_artifact_for_target() {
        let artifact = Artifact::for_target(vec![1u8, 2, 3], "clip.mov", "mp4");
        assert_eq!(artifact.mime_type, "video/mp4");
        assert_eq!(artifact.file_name, "clip.mp4");
        assert_eq!(artifact.len(), 3);
    }
}
