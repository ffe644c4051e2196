//! HTTP surface for docsum.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Upload a PDF or DOCX (multipart field `file`), extract its text, summarize
//!   it chunk by chunk, and return the newline-joined summary with chunk and length counters.
//! - `POST /analyze` – Upload a document and return a structured case analysis.
//! - `POST /extract` – Upload a document and return its plain text.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Observe request counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Every failure is answered with `{"status":"error","message":...}`: 400 for problems with the
//! client's upload, 413 for bodies over the configured limit, 500 for everything else. A document
//! rejected by the legal document check additionally carries `"is_legal": false`.

use crate::config::AllowedOrigins;
use crate::metrics::MetricsSnapshot;
use crate::processing::{ProcessingApi, ProcessingError, RequestLifecycle, RequestStage};
use crate::summarization::CaseAnalysis;
use crate::upload::TransientUpload;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>, allowed_origins: &AllowedOrigins) -> Router
where
    S: ProcessingApi + 'static,
{
    let body_limit = service.max_upload_bytes();
    Router::new()
        .route("/summarize", post(summarize_document::<S>))
        .route("/analyze", post(analyze_document::<S>))
        .route("/extract", post(extract_document::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(cors_layer(allowed_origins))
        .with_state(service)
}

fn cors_layer(allowed_origins: &AllowedOrigins) -> CorsLayer {
    match allowed_origins {
        AllowedOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        AllowedOrigins::List(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any)
        }
    }
}

/// Success response for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    status: &'static str,
    /// Partial summaries joined by newlines, in document order.
    summary: String,
    chunk_count: usize,
    original_length: usize,
    summary_length: usize,
    filename: String,
}

/// Summarize an uploaded document.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut lifecycle = RequestLifecycle::new("summarize");
    let result = async {
        let upload = receive_upload(service.as_ref(), multipart).await?;
        let outcome = service.summarize_document(&upload, &mut lifecycle).await?;
        Ok::<_, ProcessingError>((outcome, upload.original_name().to_string()))
    }
    .await;

    let (outcome, filename) = conclude(service.as_ref(), lifecycle, result)?;
    tracing::info!(
        file = %filename,
        chunks = outcome.chunk_count,
        summary_length = outcome.summary_length,
        "Summarize request completed"
    );
    Ok(Json(SummarizeResponse {
        status: "success",
        summary: outcome.summary,
        chunk_count: outcome.chunk_count,
        original_length: outcome.original_length,
        summary_length: outcome.summary_length,
        filename,
    }))
}

/// Success response for `POST /analyze`.
#[derive(Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    #[serde(flatten)]
    analysis: CaseAnalysis,
    filename: String,
}

/// Produce a structured analysis of an uploaded document.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut lifecycle = RequestLifecycle::new("analyze");
    let result = async {
        let upload = receive_upload(service.as_ref(), multipart).await?;
        let analysis = service.analyze_document(&upload, &mut lifecycle).await?;
        Ok::<_, ProcessingError>((analysis, upload.original_name().to_string()))
    }
    .await;

    let (analysis, filename) = conclude(service.as_ref(), lifecycle, result)?;
    Ok(Json(AnalyzeResponse {
        status: "success",
        analysis,
        filename,
    }))
}

/// Success response for `POST /extract`.
#[derive(Serialize)]
struct ExtractResponse {
    status: &'static str,
    text: String,
    filename: String,
}

/// Return the plain text of an uploaded document.
async fn extract_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, AppError>
where
    S: ProcessingApi,
{
    let mut lifecycle = RequestLifecycle::new("extract");
    let result = async {
        let upload = receive_upload(service.as_ref(), multipart).await?;
        let text = service.extract_document(&upload, &mut lifecycle).await?;
        Ok::<_, ProcessingError>((text, upload.original_name().to_string()))
    }
    .await;

    let (text, filename) = conclude(service.as_ref(), lifecycle, result)?;
    Ok(Json(ExtractResponse {
        status: "success",
        text,
        filename,
    }))
}

/// Store the first file part of the request as a transient upload.
///
/// Non-file parts are skipped. A file part with an empty file name counts as no file.
async fn receive_upload<S>(
    service: &S,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<TransientUpload, ProcessingError>
where
    S: ProcessingApi + ?Sized,
{
    let limit = service.max_upload_bytes();
    let mut multipart =
        multipart.map_err(|rejection| ProcessingError::InvalidUpload(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| multipart_error(error, limit))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.trim().is_empty() {
            return Err(ProcessingError::NoFileProvided);
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|error| multipart_error(error, limit))?;
        return TransientUpload::persist(service.upload_dir(), &file_name, &bytes)
            .await
            .map_err(ProcessingError::Upload);
    }

    Err(ProcessingError::NoFileProvided)
}

fn multipart_error(error: MultipartError, limit: usize) -> ProcessingError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ProcessingError::UploadTooLarge { limit }
    } else {
        ProcessingError::InvalidUpload(error.body_text())
    }
}

/// Close out the request lifecycle and count failures.
fn conclude<S, T>(
    service: &S,
    mut lifecycle: RequestLifecycle,
    result: Result<T, ProcessingError>,
) -> Result<T, AppError>
where
    S: ProcessingApi + ?Sized,
{
    let result = result.and_then(|value| {
        lifecycle.advance(RequestStage::Formatting)?;
        lifecycle.finish()?;
        Ok(value)
    });
    if let Err(error) = &result {
        lifecycle.fail(error);
        service.record_failure();
    }
    result.map_err(AppError)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Return request counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    let upload_example = json!({
        "content_type": "multipart/form-data",
        "fields": { "file": "document.pdf | document.docx" }
    });
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Extract the text of an uploaded PDF or DOCX, optionally check that it is a legal document, summarize it chunk by chunk, and return { \"summary\": string, \"chunk_count\": number, \"original_length\": number, \"summary_length\": number }.",
                request_example: Some(upload_example.clone()),
            },
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Classify an uploaded document and return case_type, legal_domain, priority_level, and summary.",
                request_example: Some(upload_example.clone()),
            },
            CommandDescriptor {
                name: "extract",
                method: "POST",
                path: "/extract",
                description: "Return the plain text extracted from an uploaded PDF or DOCX.",
                request_example: Some(upload_example),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return request counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Failure envelope shared by every route.
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_legal: Option<bool>,
}

struct AppError(ProcessingError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ProcessingError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            error if error.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let is_legal = matches!(self.0, ProcessingError::NotLegalDocument).then_some(false);
        let body = ErrorResponse {
            status: "error",
            message: self.0.to_string(),
            is_legal,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self(inner)
    }
}
