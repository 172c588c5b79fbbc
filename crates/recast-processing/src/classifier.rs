//! Format classifier: file name to media family.

use recast_core::MediaFamily;

/// Lowercase extension after the last `.` of `filename`, empty when there is none.
pub fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) => filename[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Family for a lowercase extension.
pub fn family_for_extension(extension: &str) -> MediaFamily {
    match extension {
        "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "svg" => MediaFamily::Image,
        "mp4" | "avi" | "mov" | "mkv" | "webm" | "flv" | "wmv" => MediaFamily::Video,
        "mp3" | "wav" | "aac" | "ogg" | "flac" | "m4a" => MediaFamily::Audio,
        "pdf" | "docx" | "txt" | "csv" | "xlsx" | "html" => MediaFamily::Document,
        _ => MediaFamily::Unknown,
    }
}

/// Classify a file by its extension. Never fails; unlisted extensions are `Unknown`.
pub fn classify(filename: &str) -> MediaFamily {
    family_for_extension(&extension_of(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        let table: [(&[&str], MediaFamily); 4] = [
            (
                &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "svg"],
                MediaFamily::Image,
            ),
            (
                &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv"],
                MediaFamily::Video,
            ),
            (&["mp3", "wav", "aac", "ogg", "flac", "m4a"], MediaFamily::Audio),
            (
                &["pdf", "docx", "txt", "csv", "xlsx", "html"],
                MediaFamily::Document,
            ),
        ];

        for (extensions, family) in table {
            for ext in extensions {
                assert_eq!(classify(&format!("file.{}", ext)), family, "{}", ext);
                assert_eq!(
                    classify(&format!("FILE.{}", ext.to_uppercase())),
                    family,
                    "{}",
                    ext
                );
            }
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("IMG.PNG"), MediaFamily::Image);
        assert_eq!(classify("Report.DocX"), MediaFamily::Document);
    }

    #[test]
    fn test_uses_last_dot() {
        assert_eq!(classify("clip.mp4.txt"), MediaFamily::Document);
        assert_eq!(classify("notes.txt.mp4"), MediaFamily::Video);
    }

    #[test]
    fn test_unknown_is_total() {
        assert_eq!(classify("archive.zip"), MediaFamily::Unknown);
        assert_eq!(classify("Makefile"), MediaFamily::Unknown);
        assert_eq!(classify(""), MediaFamily::Unknown);
        assert_eq!(classify("."), MediaFamily::Unknown);
        assert_eq!(classify("trailing."), MediaFamily::Unknown);
    }
}
