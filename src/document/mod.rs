//! Plain-text extraction for uploaded documents.
//!
//! Format dispatch happens on the file extension. Only PDF and DOCX are supported; every other
//! extension is rejected before any parser runs.

mod docx;
mod pdf;

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while turning a document into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared format has no extractor.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    /// The PDF parser rejected the file.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The DOCX parser rejected the file.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The parser stopped before producing a result (for example by panicking).
    #[error("Extraction aborted: {0}")]
    Aborted(String),
}

/// Declared format of an uploaded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Anything else.
    Unknown,
}

impl DocumentFormat {
    /// Derive the format from a file name's extension, ignoring case.
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// Canonical file extension, if the format is supported.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Pdf => Some("pdf"),
            Self::Docx => Some("docx"),
            Self::Unknown => None,
        }
    }

    /// Whether an extractor exists for this format.
    pub fn is_supported(self) -> bool {
        self.extension().is_some()
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().unwrap_or("unknown"))
    }
}

/// Extract plain text from the file at `path` using the parser for `format`.
///
/// This is blocking work; async callers should run it on the blocking pool.
pub fn extract_text(path: &Path, format: DocumentFormat) -> Result<String, ExtractionError> {
    let raw = match format {
        DocumentFormat::Pdf => pdf::extract(path)?,
        DocumentFormat::Docx => docx::extract(path)?,
        DocumentFormat::Unknown => {
            return Err(ExtractionError::UnsupportedType(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("")
                    .to_string(),
            ));
        }
    };
    Ok(normalize_text(&raw))
}

/// Drop control characters other than newlines and tabs, and unify line endings.
fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace(|c: char| c.is_control() && c != '\n' && c != '\t', "")
}
