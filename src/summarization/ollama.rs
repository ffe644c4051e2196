use super::{SummarizationClient, SummarizationClientError, SummaryConstraints};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "Ollama";

/// Abstractive summarizer backed by a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaSummarizationClient {
    /// Create a client that runs `model` on the runtime at `base_url`.
    pub fn new(http: Client, base_url: String, model: String) -> Self {
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

fn build_prompt(text: &str, constraints: SummaryConstraints) -> String {
    format!(
        "System: You summarize documents into concise, factual prose. Avoid speculation. \
         Use between {} and {} words. Output a single paragraph.\n\nSummarize the following text:\n{}",
        constraints.min_length,
        constraints.max_length,
        text.trim()
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(
        &self,
        text: &str,
        constraints: SummaryConstraints,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": build_prompt(text, constraints),
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
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

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> OllamaSummarizationClient {
        OllamaSummarizationClient::new(
            Client::builder()
                .user_agent("docsum-test")
                .build()
                .expect("client"),
            server.base_url(),
            "llama3".into(),
        )
    }

    const CONSTRAINTS: SummaryConstraints = SummaryConstraints {
        max_length: 120,
        min_length: 30,
    };

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"model\":\"llama3\"")
                    .body_contains("between 30 and 120 words");
                then.status(200).json_body(json!({
                    "response": "Summary text",
                    "done": true
                }));
            })
            .await;

        let summary = client(&server)
            .summarize("Clause one. Clause two.", CONSTRAINTS)
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(400).body("boom");
            })
            .await;

        let error = client(&server)
            .summarize("text", CONSTRAINTS)
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(message) if message.contains("400"))
        );
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client(&server)
            .summarize("text", CONSTRAINTS)
            .await
            .expect_err("incomplete");
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }
}
