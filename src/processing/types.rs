//! Core data types and error definitions for the processing pipeline.

use crate::document::ExtractionError;
use crate::summarization::SummarizationClientError;
use thiserror::Error;

use super::lifecycle::InvalidTransition;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configuration requested an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document processing pipeline.
///
/// Each variant maps to exactly one failure envelope at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The request carried no file part.
    #[error("No file uploaded")]
    NoFileProvided,
    /// The request body was not a readable multipart form.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
    /// The upload exceeded the configured body limit.
    #[error("Uploaded file exceeds the {limit} byte limit")]
    UploadTooLarge {
        /// Configured maximum body size in bytes.
        limit: usize,
    },
    /// The file extension has no extractor.
    #[error("Unsupported file type: {0} (expected .pdf or .docx)")]
    UnsupportedFileType(String),
    /// The document parser failed.
    #[error("Could not extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Extracted text is shorter than the configured minimum.
    #[error("Document contains too little text ({found} characters, minimum {minimum})")]
    EmptyDocument {
        /// Trimmed character count of the extracted text.
        found: usize,
        /// Configured minimum character count.
        minimum: usize,
    },
    /// The classifier judged the upload not to be a legal document.
    #[error("This does not appear to be a valid legal document. Please upload a legal document to continue.")]
    NotLegalDocument,
    /// The summarization or analysis backend failed.
    #[error("Summarization failed: {0}")]
    SummarizationBackend(#[from] SummarizationClientError),
    /// A backend needed by the request has no credentials.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The transient upload could not be written.
    #[error("Failed to store upload: {0}")]
    Upload(#[source] std::io::Error),
    /// Request bookkeeping reached an impossible state.
    #[error("Internal request state error: {0}")]
    Lifecycle(#[from] InvalidTransition),
}

impl ProcessingError {
    /// Whether the failure was caused by the client's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoFileProvided
                | Self::InvalidUpload(_)
                | Self::UploadTooLarge { .. }
                | Self::UnsupportedFileType(_)
                | Self::EmptyDocument { .. }
                | Self::NotLegalDocument
        )
    }
}

/// Result of a completed chunked summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Partial summaries joined by newlines, in chunk order.
    pub summary: String,
    /// Number of chunks sent to the backend.
    pub chunk_count: usize,
    /// Character count of the extracted text.
    pub original_length: usize,
    /// Character count of the joined summary.
    pub summary_length: usize,
}
