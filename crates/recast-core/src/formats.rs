//! Media families, format tokens and their media types.

use serde::{Deserialize, Serialize};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Top-level routing classification for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFamily {
    Image,
    Video,
    Audio,
    Document,
    Unknown,
}

impl MediaFamily {
    /// Output formats a file of this family may be converted to.
    pub fn output_formats(self) -> &'static [&'static str] {
        match self {
            MediaFamily::Image => &["jpg", "png", "webp", "gif", "bmp", "tiff"],
            MediaFamily::Video => &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv"],
            MediaFamily::Audio => &["mp3", "wav", "aac", "ogg", "flac", "m4a"],
            MediaFamily::Document => &["pdf", "docx", "txt", "csv", "xlsx", "html"],
            MediaFamily::Unknown => &[],
        }
    }

    /// Whether `format` belongs to this family's output table.
    ///
    /// `jpeg` is accepted as a spelling of `jpg`.
    pub fn accepts_output(self, format: &str) -> bool {
        let format = if format == "jpeg" { "jpg" } else { format };
        self.output_formats().contains(&format)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaFamily::Image => "image",
            MediaFamily::Video => "video",
            MediaFamily::Audio => "audio",
            MediaFamily::Document => "document",
            MediaFamily::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MediaFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type for a format token (lowercase, no leading dot).
pub fn mime_type_for(format: &str) -> &'static str {
    match format {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "html" => "text/html",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Name for a converted file: the source stem with the target format as extension.
pub fn output_file_name(source_name: &str, target_format: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(idx) => &source_name[..idx],
        None => source_name,
    };
    format!("{}.{}", stem, target_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for("jpg"), "image/jpeg");
        assert_eq!(mime_type_for("jpeg"), "image/jpeg");
        assert_eq!(mime_type_for("mkv"), "video/x-matroska");
        assert_eq!(mime_type_for("m4a"), "audio/mp4");
        assert_eq!(mime_type_for("html"), "text/html");
        assert_eq!(mime_type_for("heic"), "application/octet-stream");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("holiday.photo.png", "webp"), "holiday.photo.webp");
        assert_eq!(output_file_name("README", "html"), "README.html");
    }

    #[test]
    fn test_accepts_output() {
        assert!(MediaFamily::Image.accepts_output("jpeg"));
        assert!(MediaFamily::Image.accepts_output("png"));
        assert!(!MediaFamily::Image.accepts_output("svg"));
        assert!(!MediaFamily::Video.accepts_output("mp3"));
        assert!(MediaFamily::Document.accepts_output("csv"));
        assert!(!MediaFamily::Unknown.accepts_output("png"));
    }
}
