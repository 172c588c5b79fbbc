//! Access to the XML parts of an Office Open XML (zip) package.

use std::io::{Cursor, Read};

use recast_core::ConversionError;
use zip::result::ZipError;
use zip::ZipArchive;

pub struct OoxmlPackage<'a> {
    kind: &'static str,
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> OoxmlPackage<'a> {
    /// Open `data` as a zip package. `kind` ("DOCX", "XLSX") only labels errors.
    pub fn open(data: &'a [u8], kind: &'static str) -> Result<Self, ConversionError> {
        let archive = ZipArchive::new(Cursor::new(data)).map_err(|e| {
            ConversionError::Decode(format!("Not a valid {} package: {}", kind, e))
        })?;
        Ok(Self { kind, archive })
    }

    /// Text of the part at `name`, or `None` when the package has no such part.
    pub fn part(&mut self, name: &str) -> Result<Option<String>, ConversionError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(ConversionError::Decode(format!(
                    "Failed to open {} part {}: {}",
                    self.kind, name, e
                )))
            }
        };

        let mut text = String::new();
        file.read_to_string(&mut text).map_err(|e| {
            ConversionError::Decode(format!("Failed to read {} part {}: {}", self.kind, name, e))
        })?;

        if let Some(stripped) = text.strip_prefix('\u{feff}') {
            text = stripped.to_string();
        }
        Ok(Some(text))
    }

    pub fn required_part(&mut self, name: &str) -> Result<String, ConversionError> {
        self.part(name)?.ok_or_else(|| {
            ConversionError::Decode(format!("{} package is missing {}", self.kind, name))
        })
    }

    /// Decode failure for a part whose content could not be read.
    pub fn xml_error(&self, part: &str, err: impl std::fmt::Display) -> ConversionError {
        ConversionError::Decode(format!("{} part {} is malformed: {}", self.kind, part, err))
    }
}
