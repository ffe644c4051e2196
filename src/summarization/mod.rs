//! Clients for the external summarization and analysis backends.
//!
//! Two capabilities are exposed behind traits so the processing pipeline never depends on a
//! concrete provider:
//!
//! - [`SummarizationClient`] turns one chunk of text into a shorter text. Implemented by the hosted
//!   Hugging Face inference API and by a local Ollama runtime.
//! - [`AnalysisClient`] turns a whole document into a structured [`CaseAnalysis`]. Implemented by
//!   the Gemini `generateContent` API.
//! - [`LegalDocumentValidator`] answers whether a text excerpt is a legal document at all. Also
//!   implemented by the Gemini client.
//!
//! All adapters issue HTTP requests directly with `reqwest`.

mod gemini;
mod huggingface;
mod ollama;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiAnalysisClient;
pub use huggingface::HuggingFaceClient;
pub use ollama::OllamaSummarizationClient;

/// Errors surfaced by summarization and analysis backends.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Credentials or endpoints required by the provider are absent.
    #[error("Summarization provider not configured: {0}")]
    NotConfigured(String),
    /// Provider could not be reached or is temporarily unable to serve requests.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider rejected the request because of rate limiting.
    #[error("Summarization provider rate limited the request: {0}")]
    RateLimited(String),
    /// Provider did not answer within the configured timeout.
    #[error("Summarization provider timed out: {0}")]
    Timeout(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Timeout(_)
        )
    }

    /// Classify a non-success HTTP status returned by `provider`.
    pub(crate) fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
        let message = format!("{provider} returned {status}: {}", body.trim());
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited(message)
        } else if status.is_server_error() {
            Self::ProviderUnavailable(message)
        } else {
            Self::GenerationFailed(message)
        }
    }

    /// Classify a transport-level failure while talking to `provider` at `base_url`.
    pub(crate) fn from_transport(provider: &str, base_url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(format!("request to {provider} at {base_url} timed out"))
        } else {
            Self::ProviderUnavailable(format!(
                "failed to reach {provider} at {base_url}: {error}"
            ))
        }
    }
}

/// Length bounds requested from an abstractive summarizer for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryConstraints {
    /// Upper bound on the summary length.
    pub max_length: usize,
    /// Lower bound on the summary length.
    pub min_length: usize,
}

impl SummaryConstraints {
    /// Read the bounds from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_length: config.summary_max_length,
            min_length: config.summary_min_length,
        }
    }
}

/// Structured record produced by the analysis backend for a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    /// Broad case category such as `Civil` or `Criminal`.
    pub case_type: String,
    /// Area of law, e.g. `Contract Law`.
    pub legal_domain: String,
    /// `High`, `Medium` or `Low`.
    pub priority_level: String,
    /// Short plain-language summary.
    pub summary: String,
    /// Suggested next steps, when the model provides them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_steps: Option<Vec<String>>,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize one chunk of text within the given length bounds.
    async fn summarize(
        &self,
        text: &str,
        constraints: SummaryConstraints,
    ) -> Result<String, SummarizationClientError>;
}

/// Interface implemented by structured analysis providers.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Produce a structured analysis of the supplied document text.
    async fn analyze(&self, text: &str) -> Result<CaseAnalysis, SummarizationClientError>;
}

/// Interface implemented by providers that classify documents before summarization.
#[async_trait]
pub trait LegalDocumentValidator: Send + Sync {
    /// Return `true` when `excerpt` reads as a legal document.
    async fn is_legal_document(&self, excerpt: &str) -> Result<bool, SummarizationClientError>;
}

/// Build the summarization client selected by configuration.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Box<dyn SummarizationClient>, SummarizationClientError> {
    let http = http_client(config, "docsum/summarize")?;
    match config.summarization_provider {
        SummarizationProvider::HuggingFace => {
            let api_key = config.huggingface_api_key.clone().ok_or_else(|| {
                SummarizationClientError::NotConfigured("HUGGINGFACE_API_KEY is not set".into())
            })?;
            Ok(Box::new(HuggingFaceClient::new(
                http,
                config.huggingface_url.clone(),
                api_key,
                config.summarization_model.clone(),
            )))
        }
        SummarizationProvider::Ollama => Ok(Box::new(OllamaSummarizationClient::new(
            http,
            config.ollama_url.clone(),
            config.summarization_model.clone(),
        ))),
    }
}

/// Build the analysis client, or `None` when no Gemini key is configured.
pub fn build_analysis_client(
    config: &Config,
) -> Result<Option<Box<dyn AnalysisClient>>, SummarizationClientError> {
    let Some(api_key) = config.gemini_api_key.clone() else {
        return Ok(None);
    };
    let http = http_client(config, "docsum/analyze")?;
    Ok(Some(Box::new(GeminiAnalysisClient::new(
        http,
        config.gemini_url.clone(),
        api_key,
        config.analysis_model.clone(),
    ))))
}

/// Build the legal document check, or `None` unless `LEGAL_VALIDATION` is enabled.
pub fn build_legal_validator(
    config: &Config,
) -> Result<Option<Box<dyn LegalDocumentValidator>>, SummarizationClientError> {
    if !config.legal_validation {
        return Ok(None);
    }
    let api_key = config.gemini_api_key.clone().ok_or_else(|| {
        SummarizationClientError::NotConfigured(
            "GEMINI_API_KEY is required when LEGAL_VALIDATION is enabled".into(),
        )
    })?;
    let http = http_client(config, "docsum/validate")?;
    Ok(Some(Box::new(GeminiAnalysisClient::new(
        http,
        config.gemini_url.clone(),
        api_key,
        config.analysis_model.clone(),
    ))))
}

fn http_client(config: &Config, user_agent: &str) -> Result<Client, SummarizationClientError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(config.backend_timeout)
        .build()
        .map_err(|error| {
            SummarizationClientError::NotConfigured(format!("failed to build HTTP client: {error}"))
        })
}
