use super::{AnalysisClient, CaseAnalysis, LegalDocumentValidator, SummarizationClientError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "Gemini";

/// Structured case analysis and legal document classification backed by the Gemini
/// `generateContent` API.
pub struct GeminiAnalysisClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAnalysisClient {
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
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Send one prompt and return the text of the first candidate.
    async fn generate(
        &self,
        prompt: String,
        generation_config: serde_json::Value,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode {PROVIDER} response: {error}"
            ))
        })?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("response contained no text".into())
            })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"You are a legal expert assistant. Analyze the following text.

Return a valid JSON object with these exact keys:
1. "case_type" (e.g., Civil, Criminal)
2. "legal_domain" (e.g., Intellectual Property, Contract Law)
3. "priority_level" (High, Medium, Low)
4. "summary" (concise summary in 3 sentences)
5. "recommended_steps" (array of short next steps for the reader)

Do not use Markdown. Return only the JSON object.

DOCUMENT TEXT:
{text}"#
    )
}

fn build_classification_prompt(excerpt: &str) -> String {
    format!(
        r#"You are a legal document classifier. Answer with only YES if the text below is a legal document (for example an agreement, contract, court order, petition, notice, affidavit or judgment) or only NO if it is not.

TEXT:
{excerpt}"#
    )
}

/// Any reply mentioning `YES` counts as a legal document.
fn parse_verdict(raw: &str) -> bool {
    raw.trim().to_uppercase().contains("YES")
}

/// Remove Markdown code fences that models wrap around JSON despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_analysis(raw: &str) -> Result<CaseAnalysis, SummarizationClientError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|error| {
        SummarizationClientError::InvalidResponse(format!(
            "analysis was not valid JSON ({error})"
        ))
    })
}

#[async_trait]
impl AnalysisClient for GeminiAnalysisClient {
    async fn analyze(&self, text: &str) -> Result<CaseAnalysis, SummarizationClientError> {
        let content = self
            .generate(
                build_prompt(text),
                json!({ "temperature": 0.2, "responseMimeType": "application/json" }),
            )
            .await?;

        tracing::debug!(model = %self.model, chars = content.len(), "Received analysis");
        parse_analysis(&content)
    }
}

#[async_trait]
impl LegalDocumentValidator for GeminiAnalysisClient {
    async fn is_legal_document(&self, excerpt: &str) -> Result<bool, SummarizationClientError> {
        let verdict = self
            .generate(
                build_classification_prompt(excerpt),
                json!({ "temperature": 0.0 }),
            )
            .await?;
        tracing::debug!(model = %self.model, verdict = %verdict.trim(), "Received legal document verdict");
        Ok(parse_verdict(&verdict))
    }
}
