//! Document service coordinating extraction, chunked summarization, and analysis.

use crate::{
    config::Config,
    document::{self, ExtractionError},
    metrics::{MetricsSnapshot, ServiceMetrics},
    processing::{
        lifecycle::{RequestLifecycle, RequestStage},
        pipeline::{self, SummarizationPipeline},
        types::{ProcessingError, SummaryOutcome},
    },
    summarization::{
        AnalysisClient, CaseAnalysis, LegalDocumentValidator, SummarizationClient,
        build_analysis_client, build_legal_validator, build_summarization_client,
    },
    upload::TransientUpload,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Coordinates the document pipeline: extraction, chunking, and backend calls.
///
/// The service owns long-lived handles to the summarization and analysis clients and the metrics
/// registry. Construct it once near process start and share it through an `Arc`.
pub struct DocumentService {
    config: Arc<Config>,
    pipeline: SummarizationPipeline,
    summarizer: Box<dyn SummarizationClient>,
    analyzer: Option<Box<dyn AnalysisClient>>,
    validator: Option<Box<dyn LegalDocumentValidator>>,
    metrics: Arc<ServiceMetrics>,
}

/// Abstraction over the document pipeline used by the HTTP surface.
///
/// Operations take the request's [`RequestLifecycle`] and advance it through the stages they
/// perform; the caller owns the final `Formatting`/`Done`/`Failed` transitions.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Directory where transient uploads are written.
    fn upload_dir(&self) -> &Path;

    /// Largest accepted request body in bytes.
    fn max_upload_bytes(&self) -> usize;

    /// Extract, chunk, and summarize an uploaded document.
    async fn summarize_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Extract an uploaded document and request a structured analysis of it.
    async fn analyze_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<CaseAnalysis, ProcessingError>;

    /// Extract the plain text of an uploaded document.
    async fn extract_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<String, ProcessingError>;

    /// Count a request that ended in an error envelope.
    fn record_failure(&self);

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Build the service and its backend clients from configuration.
    pub fn new(config: Arc<Config>) -> Result<Self, ProcessingError> {
        tracing::info!(
            provider = ?config.summarization_provider,
            model = %config.summarization_model,
            "Initializing summarization client"
        );
        let summarizer = build_summarization_client(&config)
            .map_err(|error| ProcessingError::MissingConfiguration(error.to_string()))?;
        let analyzer = build_analysis_client(&config)
            .map_err(|error| ProcessingError::MissingConfiguration(error.to_string()))?;
        if analyzer.is_none() {
            tracing::info!("GEMINI_API_KEY not set; /analyze will report missing configuration");
        }
        let validator = build_legal_validator(&config)
            .map_err(|error| ProcessingError::MissingConfiguration(error.to_string()))?;
        let service = Self::with_clients(config, summarizer, analyzer)?;
        Ok(match validator {
            Some(validator) => service.with_legal_validator(validator),
            None => service,
        })
    }

    /// Build the service around explicit backend clients.
    pub fn with_clients(
        config: Arc<Config>,
        summarizer: Box<dyn SummarizationClient>,
        analyzer: Option<Box<dyn AnalysisClient>>,
    ) -> Result<Self, ProcessingError> {
        let pipeline = SummarizationPipeline::from_config(&config)?;
        Ok(Self {
            config,
            pipeline,
            summarizer,
            analyzer,
            validator: None,
            metrics: Arc::new(ServiceMetrics::new()),
        })
    }

    /// Reject documents that `validator` does not classify as legal before summarizing them.
    pub fn with_legal_validator(mut self, validator: Box<dyn LegalDocumentValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Extract text from a stored upload on the blocking pool.
    async fn extract(&self, upload: &TransientUpload) -> Result<String, ProcessingError> {
        let format = upload.format();
        if !format.is_supported() {
            return Err(ProcessingError::UnsupportedFileType(extension_label(
                upload.original_name(),
            )));
        }

        let path = upload.path().to_path_buf();
        let text = tokio::task::spawn_blocking(move || document::extract_text(&path, format))
            .await
            .map_err(|error| ExtractionError::Aborted(error.to_string()))??;
        tracing::debug!(
            file = upload.original_name(),
            %format,
            chars = text.chars().count(),
            "Extracted document text"
        );
        Ok(text)
    }

    /// Ask the configured classifier about the start of `text`; a no-op without one.
    async fn ensure_legal(
        &self,
        upload: &TransientUpload,
        text: &str,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<(), ProcessingError> {
        let Some(validator) = self.validator.as_deref() else {
            return Ok(());
        };
        lifecycle.advance(RequestStage::Validating)?;
        let excerpt = truncate_chars(text, self.config.legal_validation_chars);
        let is_legal = self
            .pipeline
            .retry_policy()
            .call(|| validator.is_legal_document(excerpt))
            .await?;
        tracing::info!(file = upload.original_name(), is_legal, "Legal document check");
        if !is_legal {
            return Err(ProcessingError::NotLegalDocument);
        }
        Ok(())
    }

    /// Chunk and summarize an uploaded document.
    ///
    /// With a legal document check configured, documents it rejects fail with
    /// [`ProcessingError::NotLegalDocument`] before any chunk is summarized.
    pub async fn summarize_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<SummaryOutcome, ProcessingError> {
        tracing::info!(file = upload.original_name(), "Summarizing document");
        lifecycle.advance(RequestStage::Extracting)?;
        let text = self.extract(upload).await?;
        self.pipeline.ensure_content(&text)?;
        self.ensure_legal(upload, &text, lifecycle).await?;

        lifecycle.advance(RequestStage::Chunking)?;
        let chunks = self.pipeline.split(&text)?;

        lifecycle.advance(RequestStage::Summarizing)?;
        let partials = self
            .pipeline
            .summarize_chunks(self.summarizer.as_ref(), &chunks)
            .await?;

        let outcome = pipeline::outcome(&text, chunks.len(), &partials);
        self.metrics.record_summary(outcome.chunk_count as u64);
        tracing::info!(
            file = upload.original_name(),
            chunks = outcome.chunk_count,
            original_length = outcome.original_length,
            summary_length = outcome.summary_length,
            "Document summarized"
        );
        Ok(outcome)
    }

    /// Request a structured analysis of an uploaded document.
    ///
    /// Fails with [`ProcessingError::MissingConfiguration`] before touching the file when no
    /// analysis backend is configured.
    pub async fn analyze_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<CaseAnalysis, ProcessingError> {
        let analyzer = self.analyzer.as_deref().ok_or_else(|| {
            ProcessingError::MissingConfiguration("GEMINI_API_KEY is not set".into())
        })?;

        tracing::info!(file = upload.original_name(), "Analyzing document");
        lifecycle.advance(RequestStage::Extracting)?;
        let text = self.extract(upload).await?;
        self.pipeline.ensure_content(&text)?;
        let excerpt = truncate_chars(&text, self.config.analysis_max_chars);

        lifecycle.advance(RequestStage::Summarizing)?;
        let analysis = self
            .pipeline
            .retry_policy()
            .call(|| analyzer.analyze(excerpt))
            .await?;

        self.metrics.record_analysis();
        tracing::info!(
            file = upload.original_name(),
            case_type = %analysis.case_type,
            priority = %analysis.priority_level,
            truncated = excerpt.len() < text.len(),
            "Document analyzed"
        );
        Ok(analysis)
    }

    /// Return the plain text of an uploaded document.
    pub async fn extract_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<String, ProcessingError> {
        lifecycle.advance(RequestStage::Extracting)?;
        self.extract(upload).await
    }

    /// Return the current request metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ProcessingApi for DocumentService {
    fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    async fn summarize_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<SummaryOutcome, ProcessingError> {
        DocumentService::summarize_document(self, upload, lifecycle).await
    }

    async fn analyze_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<CaseAnalysis, ProcessingError> {
        DocumentService::analyze_document(self, upload, lifecycle).await
    }

    async fn extract_document(
        &self,
        upload: &TransientUpload,
        lifecycle: &mut RequestLifecycle,
    ) -> Result<String, ProcessingError> {
        DocumentService::extract_document(self, upload, lifecycle).await
    }

    fn record_failure(&self) {
        self.metrics.record_failure();
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}

/// Human-readable extension of a client file name, e.g. `.txt`.
fn extension_label(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| file_name.to_string())
}

/// Borrow at most `max_chars` characters from the start of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarization::{SummarizationClientError, SummaryConstraints};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct EchoSummarizer {
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl SummarizationClient for EchoSummarizer {
        async fn summarize(
            &self,
            text: &str,
            _constraints: SummaryConstraints,
        ) -> Result<String, SummarizationClientError> {
            *self.calls.lock().expect("lock") += 1;
            Ok(format!("{} chars", text.chars().count()))
        }
    }

    struct RecordingAnalyzer {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AnalysisClient for RecordingAnalyzer {
        async fn analyze(&self, text: &str) -> Result<CaseAnalysis, SummarizationClientError> {
            self.seen.lock().expect("lock").push(text.to_string());
            Ok(CaseAnalysis {
                case_type: "Tenancy".into(),
                legal_domain: "Civil".into(),
                priority_level: "Low".into(),
                summary: "Rent dispute.".into(),
                recommended_steps: None,
            })
        }
    }

    struct FixedVerdict {
        is_legal: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LegalDocumentValidator for FixedVerdict {
        async fn is_legal_document(&self, excerpt: &str) -> Result<bool, SummarizationClientError> {
            self.seen.lock().expect("lock").push(excerpt.to_string());
            Ok(self.is_legal)
        }
    }

    fn docx_bytes(paragraph: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        docx_rs::Docx::new()
            .add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(paragraph)))
            .build()
            .pack(&mut buffer)
            .expect("pack docx");
        buffer.into_inner()
    }

    fn test_config(dir: &Path) -> Arc<Config> {
        Arc::new(Config {
            upload_dir: dir.to_path_buf(),
            huggingface_api_key: Some("test-key".into()),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn summarizes_uploaded_docx() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(0));
        let service = DocumentService::with_clients(
            test_config(dir.path()),
            Box::new(EchoSummarizer {
                calls: calls.clone(),
            }),
            None,
        )
        .expect("service");

        let body = "x".repeat(2500);
        let upload = TransientUpload::persist(dir.path(), "lease.docx", &docx_bytes(&body))
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("summarize");

        let outcome = service
            .summarize_document(&upload, &mut lifecycle)
            .await
            .expect("summary");

        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(*calls.lock().expect("lock"), 3);
        assert_eq!(lifecycle.stage(), &RequestStage::Summarizing);
        assert_eq!(service.metrics_snapshot().documents_summarized, 1);
        assert_eq!(service.metrics_snapshot().chunks_summarized, 3);
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(0));
        let service = DocumentService::with_clients(
            test_config(dir.path()),
            Box::new(EchoSummarizer {
                calls: calls.clone(),
            }),
            None,
        )
        .expect("service");
        let upload = TransientUpload::persist(dir.path(), "notes.txt", b"plain text")
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("summarize");

        let error = service
            .summarize_document(&upload, &mut lifecycle)
            .await
            .expect_err("unsupported");

        assert!(matches!(error, ProcessingError::UnsupportedFileType(ref ext) if ext == ".txt"));
        assert_eq!(*calls.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn rejected_document_never_reaches_summarizer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(Config {
            legal_validation_chars: 50,
            ..(*test_config(dir.path())).clone()
        });
        let service = DocumentService::with_clients(
            config,
            Box::new(EchoSummarizer {
                calls: calls.clone(),
            }),
            None,
        )
        .expect("service")
        .with_legal_validator(Box::new(FixedVerdict {
            is_legal: false,
            seen: seen.clone(),
        }));
        let upload = TransientUpload::persist(dir.path(), "recipe.docx", &docx_bytes(&"y".repeat(300)))
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("summarize");

        let error = service
            .summarize_document(&upload, &mut lifecycle)
            .await
            .expect_err("not legal");

        assert!(matches!(error, ProcessingError::NotLegalDocument));
        assert_eq!(*calls.lock().expect("lock"), 0);
        assert_eq!(lifecycle.stage(), &RequestStage::Validating);
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].chars().count(), 50);
    }

    #[tokio::test]
    async fn accepted_document_is_summarized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(Mutex::new(0));
        let service = DocumentService::with_clients(
            test_config(dir.path()),
            Box::new(EchoSummarizer {
                calls: calls.clone(),
            }),
            None,
        )
        .expect("service")
        .with_legal_validator(Box::new(FixedVerdict {
            is_legal: true,
            seen: Arc::new(Mutex::new(Vec::new())),
        }));
        let upload = TransientUpload::persist(dir.path(), "lease.docx", &docx_bytes("The tenant agrees to pay rent."))
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("summarize");

        let outcome = service
            .summarize_document(&upload, &mut lifecycle)
            .await
            .expect("summary");

        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(*calls.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn analysis_without_backend_reports_missing_configuration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = DocumentService::with_clients(
            test_config(dir.path()),
            Box::new(EchoSummarizer {
                calls: Arc::new(Mutex::new(0)),
            }),
            None,
        )
        .expect("service");
        let upload = TransientUpload::persist(dir.path(), "brief.docx", &docx_bytes("text"))
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("analyze");

        let error = service
            .analyze_document(&upload, &mut lifecycle)
            .await
            .expect_err("missing key");

        assert!(matches!(error, ProcessingError::MissingConfiguration(_)));
        assert_eq!(lifecycle.stage(), &RequestStage::Received);
    }

    #[tokio::test]
    async fn analysis_input_is_truncated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = Arc::new(Config {
            analysis_max_chars: 100,
            ..(*test_config(dir.path())).clone()
        });
        let service = DocumentService::with_clients(
            config,
            Box::new(EchoSummarizer {
                calls: Arc::new(Mutex::new(0)),
            }),
            Some(Box::new(RecordingAnalyzer { seen: seen.clone() })),
        )
        .expect("service");
        let upload = TransientUpload::persist(dir.path(), "brief.docx", &docx_bytes(&"é".repeat(400)))
            .await
            .expect("upload");
        let mut lifecycle = RequestLifecycle::new("analyze");

        let analysis = service
            .analyze_document(&upload, &mut lifecycle)
            .await
            .expect("analysis");

        assert_eq!(analysis.case_type, "Tenancy");
        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].chars().count(), 100);
        assert_eq!(service.metrics_snapshot().documents_analyzed, 1);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn extension_label_falls_back_to_name() {
        assert_eq!(extension_label("notes.TXT"), ".TXT");
        assert_eq!(extension_label("README"), "README");
    }
}
