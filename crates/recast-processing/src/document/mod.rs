//! Document conversions, dispatched by source format.
//!
//! | source | targets     |
//! |--------|-------------|
//! | docx   | html, txt   |
//! | xlsx   | csv, html   |
//! | pdf    | txt (page-count placeholder only) |
//! | txt    | html, csv   |
//!
//! csv and html files classify as documents but have no conversion path.

pub mod docx;
pub mod package;
pub mod pdf;
pub mod text;
pub mod xlsx;
pub mod xml;

use async_trait::async_trait;
use bytes::Bytes;
use recast_core::{Artifact, ConversionError, ConversionSettings, MediaFamily, SourceFile};

use crate::classifier::extension_of;
use crate::progress::ProgressSink;
use crate::traits::Transcoder;

pub use docx::DocxDocument;
pub use pdf::PageCounter;
pub use xlsx::Sheet;

const DISPATCHED: u8 = 30;
const DOCX_READ: u8 = 50;
const XLSX_READ: u8 = 60;
const PDF_READ: u8 = 70;
const TXT_READ: u8 = 60;
const WRITTEN: u8 = 90;

/// Document formats with a conversion path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    Docx,
    Xlsx,
    Pdf,
    Txt,
}

impl DocumentSource {
    pub fn parse(extension: &str) -> Option<Self> {
        match extension {
            "docx" => Some(DocumentSource::Docx),
            "xlsx" => Some(DocumentSource::Xlsx),
            "pdf" => Some(DocumentSource::Pdf),
            "txt" => Some(DocumentSource::Txt),
            _ => None,
        }
    }

    pub fn targets(self) -> &'static [&'static str] {
        match self {
            DocumentSource::Docx => &["html", "txt"],
            DocumentSource::Xlsx => &["csv", "html"],
            DocumentSource::Pdf => &["txt"],
            DocumentSource::Txt => &["html", "csv"],
        }
    }
}

#[derive(Default)]
pub struct DocumentTranscoder;

impl DocumentTranscoder {
    pub fn new() -> Self {
        Self
    }
}

/// Run one conversion. `target` has already been checked against `source.targets()`.
fn convert_blocking(
    source: DocumentSource,
    data: &[u8],
    target: &str,
    progress: &ProgressSink,
) -> Result<String, ConversionError> {
    match source {
        DocumentSource::Docx => {
            let document = DocxDocument::parse(data)?;
            progress.report(DOCX_READ);
            let output = if target == "html" {
                document.to_html()
            } else {
                document.to_text()
            };
            progress.report(WRITTEN);
            Ok(output)
        }
        DocumentSource::Xlsx => {
            let sheet = Sheet::parse(data)?;
            progress.report(XLSX_READ);
            let output = if target == "csv" {
                sheet.to_csv()
            } else {
                sheet.to_html()
            };
            progress.report(WRITTEN);
            Ok(output)
        }
        DocumentSource::Pdf => {
            let pages = PageCounter::new()?.count(data)?;
            progress.report(PDF_READ);
            tracing::warn!(
                pages = pages,
                "PDF text extraction is not supported; returning page count placeholder"
            );
            Ok(pdf::placeholder_text(pages))
        }
        DocumentSource::Txt => {
            let text = std::str::from_utf8(data).map_err(|e| {
                ConversionError::Decode(format!("Text file is not valid UTF-8: {}", e))
            })?;
            progress.report(TXT_READ);
            let output = if target == "html" {
                text::txt_to_html(text)
            } else {
                text::txt_to_csv(text)
            };
            progress.report(WRITTEN);
            Ok(output)
        }
    }
}

#[async_trait]
impl Transcoder for DocumentTranscoder {
    fn family(&self) -> MediaFamily {
        MediaFamily::Document
    }

    /// Convert a docx, xlsx, pdf or txt file.
    ///
    /// pdf to txt is a degraded conversion: the output only reports the page count.
    #[tracing::instrument(skip_all, fields(file = %file.name, to = %target))]
    async fn convert(
        &self,
        file: &SourceFile,
        target: &str,
        _settings: &ConversionSettings,
        progress: &ProgressSink,
    ) -> Result<Artifact, ConversionError> {
        progress.report(DISPATCHED);

        let extension = extension_of(&file.name);
        let source = DocumentSource::parse(&extension).ok_or_else(|| {
            ConversionError::unsupported_conversion_with(
                &extension,
                target,
                format!("Unsupported document format: {}", extension),
            )
        })?;

        if !source.targets().contains(&target) {
            return Err(ConversionError::unsupported_conversion(&extension, target));
        }

        let data: Bytes = file.data.clone();
        let target_owned = target.to_string();
        let sink = progress.clone();
        let output = tokio::task::spawn_blocking(move || {
            convert_blocking(source, &data, &target_owned, &sink)
        })
        .await
        .map_err(|e| ConversionError::Internal(format!("Document conversion task failed: {}", e)))??;

        Ok(Artifact::for_target(output.into_bytes(), &file.name, target))
    }
}
