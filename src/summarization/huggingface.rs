use super::{SummarizationClient, SummarizationClientError, SummaryConstraints};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "Hugging Face";

/// Abstractive summarizer backed by the hosted Hugging Face inference API.
pub struct HuggingFaceClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HuggingFaceClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(http: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.base_url.trim_end_matches('/'),
            self.model.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Summaries(Vec<SummaryText>),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct SummaryText {
    summary_text: String,
}

#[async_trait]
impl SummarizationClient for HuggingFaceClient {
    async fn summarize(
        &self,
        text: &str,
        constraints: SummaryConstraints,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "inputs": text,
            "parameters": {
                "max_length": constraints.max_length,
                "min_length": constraints.min_length,
                "do_sample": false,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::from_transport(PROVIDER, &self.base_url, error)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::from_status(PROVIDER, status, &body));
        }

        let body: InferenceResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode {PROVIDER} response: {error}"
            ))
        })?;

        match body {
            InferenceResponse::Summaries(summaries) => summaries
                .into_iter()
                .next()
                .map(|summary| summary.summary_text.trim().to_string())
                .ok_or_else(|| {
                    SummarizationClientError::InvalidResponse(
                        "response contained no summaries".into(),
                    )
                }),
            InferenceResponse::Error { error } => {
                Err(SummarizationClientError::GenerationFailed(error))
            }
        }
    }
}
