//! Gemini `generateContent` binding for the generative text provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{GenerativeTextProvider, ProviderError, ProviderResult};
use crate::config::EventopiaConfig;

const SYSTEM_INSTRUCTION: &str = "You are a local travel planner who creates itineraries based on a list of events that are happening around and your own knowledge of things to do.";

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<ContentBlock>,
    system_instruction: ContentBlock,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ContentBlock,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn new(config: &EventopiaConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.generation.timeout_seconds.into(),
            ))
            .user_agent("Eventopia/0.1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.generation.api_key.clone().unwrap_or_default(),
            base_url: config.generation.base_url.clone(),
            model: config.generation.model.clone(),
        })
    }
}

#[async_trait]
impl GenerativeTextProvider for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        );

        let request = GenerateContentRequest {
            contents: vec![ContentBlock {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            system_instruction: ContentBlock {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
                role: None,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Gemini API returned {status}: {body}"
            )));
        }

        let response: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::Malformed(format!("failed to parse Gemini response: {e}"))
        })?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ProviderError::Malformed("Gemini response contained no candidates".to_string())
            })?;

        debug!("Received {} characters of generated text", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = EventopiaConfig::default();
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "hello"}], "role": "model"}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_empty_response_has_no_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.candidates.is_empty());
    }
}
