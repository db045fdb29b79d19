use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;

use crate::llm::generator::{FragmentStream, TextGenerator};

/// Thin client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Backend returned a response with no text content")]
    EmptyResponse,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt }
                    ]
                }
            ]
        })
    }

    pub async fn send_generate_request(
        &self,
        model_name: &str,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let resp = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, model_name
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, message });
        }

        Ok(resp.json::<GenerateContentResponse>().await?)
    }

    /// Opens a server-sent-events generation stream and yields each chunk's
    /// text as one fragment.
    pub async fn send_streaming_request(
        &self,
        model_name: &str,
        prompt: &str,
    ) -> Result<FragmentStream, GeminiError> {
        let resp = self
            .client
            .post(format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, model_name
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api { status, message });
        }

        let stream = resp
            .bytes_stream()
            .scan(String::new(), |pending, chunk| {
                let out = match chunk {
                    Ok(bytes) => {
                        pending.push_str(&String::from_utf8_lossy(&bytes));
                        drain_sse_fragments(pending)
                    }
                    Err(e) => vec![Err(anyhow::Error::from(e))],
                };
                futures::future::ready(Some(futures::stream::iter(out)))
            })
            .flatten()
            .boxed();

        Ok(stream)
    }
}

/// Splits complete SSE lines off the front of `pending` and extracts the text
/// of each `data:` payload. Incomplete trailing lines stay buffered for the
/// next chunk.
fn drain_sse_fragments(pending: &mut String) -> Vec<anyhow::Result<String>> {
    let mut fragments = Vec::new();
    while let Some(pos) = pending.find('\n') {
        let line: String = pending.drain(..=pos).collect();
        let line = line.trim();
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<GenerateContentResponse>(payload) {
            Ok(chunk) => {
                if let Some(text) = chunk.first_text() {
                    fragments.push(Ok(text));
                }
            }
            Err(e) => tracing::debug!(error = %e, "Skipping unparseable SSE payload"),
        }
    }
    fragments
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    pub parts: Option<Vec<ContentPart>>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, if any.
    pub fn first_text(&self) -> Option<String> {
        let parts = self
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?;
        let text: String = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl TextGenerator for GeminiClient {
    const GENERATION_MODEL: &'static str = "gemma-3n-e2b-it";

    type Error = GeminiError;

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, Self::Error> {
        self.send_streaming_request(Self::GENERATION_MODEL, prompt)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to open generation stream"))
    }

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let response = self
            .send_generate_request(Self::GENERATION_MODEL, prompt)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to generate content"))?;

        response.first_text().ok_or(GeminiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("Hello"));
    }

    #[test]
    fn first_text_handles_missing_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_text().is_none());
    }

    #[test]
    fn sse_fragments_are_drained_line_by_line() {
        let mut pending = String::from(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\
             data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\
             data: incomplete",
        );

        let fragments: Vec<String> = drain_sse_fragments(&mut pending)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Hel", "lo"]);
        // the partial line stays buffered
        assert_eq!(pending, "data: incomplete");
    }
}
