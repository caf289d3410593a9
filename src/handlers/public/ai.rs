use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ai::{self, gemini::GeminiBackend, PromptType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt_type: String,
    #[serde(default)]
    pub data: Value,
    /// Caller-supplied credential; overrides the server-side key
    pub api_key: Option<String>,
}

/// POST /ai/generate - Turn a structured request into marketing copy.
/// No bearer token required; the credential check is the gate.
pub async fn generate(Json(payload): Json<GenerateRequest>) -> ApiResult<Value> {
    let api_key = ai::resolve_credential(payload.api_key.as_deref())?;
    let prompt_type = PromptType::parse(&payload.prompt_type)?;

    let backend = GeminiBackend::new(api_key)
        .map_err(|e| crate::error::ApiError::internal_server_error(e.to_string()))?;

    let result = ai::generate(&backend, prompt_type, &payload.data).await?;

    Ok(ApiResponse::success(json!({ "result": result })))
}
