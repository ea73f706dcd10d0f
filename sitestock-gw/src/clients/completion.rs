//! Language-model completion client (Gemini generateContent API)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_AGENT: &str = "SiteStock/0.1.0";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Completion client errors
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty completion response")]
    Empty,

    #[error("Completion disabled: no API key configured")]
    NotConfigured,
}

/// Capability interface for the external completion collaborator.
///
/// The query router hands over a fully assembled prompt and only consumes the
/// returned text; tests substitute deterministic fakes.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Gemini generateContent API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client; a missing API key leaves it in a degraded state where
    /// every call reports `CompletionError::NotConfigured`.
    pub fn new(api_key: Option<String>) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait::async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::NotConfigured)?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, GEMINI_MODEL, api_key
        );

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        // Safety blocks and empty candidates both surface as Empty
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(CompletionError::Empty);
        }

        Ok(text)
    }
}
