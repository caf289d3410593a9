use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{BackendError, GenerationBackend};
use crate::config;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini generateContent backend over reqwest.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Result<Self, BackendError> {
        let timeout = config::config().ai.request_timeout_secs;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| BackendError::Other(format!("http client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Override the API base URL (tests point this at a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, model: &str, action: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, action, self.api_key
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: user_prompt.to_string() }],
            }],
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part { text: system_prompt.to_string() }],
            }),
        };

        let response = self
            .client
            .post(self.endpoint(model, "generateContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("request error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<unavailable>".into());
            return Err(classify_http_error(status, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("response decode: {}", e)))?;

        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(BackendError::Unavailable(format!(
                "model '{}' returned no text candidates",
                model
            )));
        }

        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("request error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "<unavailable>".into());
            return Err(classify_http_error(status, &body));
        }

        let payload: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("response decode: {}", e)))?;

        Ok(payload
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

/// A 401/403 (or an explicit API-key complaint) means the credential itself
/// is bad; everything else is just this model failing.
fn classify_http_error(status: StatusCode, body: &str) -> BackendError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return BackendError::Auth(format!("{}: {}", status, truncate(body)));
    }
    if body.contains("API key not valid") || body.contains("API_KEY_INVALID") {
        return BackendError::Auth(truncate(body));
    }
    BackendError::Unavailable(format!("{}: {}", status, truncate(body)))
}

fn truncate(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        return body.to_string();
    }
    // Cut on a char boundary; provider error bodies can be non-ASCII
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}
