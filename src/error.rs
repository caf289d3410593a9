// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidFormat(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidFormat(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidFormat(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to the wire body: `{"error": "..."}`
    pub fn to_json(&self) -> Value {
        json!({ "error": self.message() })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ApiError::InvalidFormat(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert domain error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::manager::DatabaseError::ConfigMissing(name) => {
                tracing::error!("Missing configuration: {}", name);
                ApiError::internal_server_error("Server misconfiguration")
            }
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::services::backup::BackupError> for ApiError {
    fn from(err: crate::services::backup::BackupError) -> Self {
        use crate::services::backup::BackupError;
        match err {
            BackupError::InvalidFormat(msg) => ApiError::invalid_format(msg),
            BackupError::TenantMismatch => ApiError::forbidden(
                "Backup belongs to a different organization and cannot be restored here",
            ),
            BackupError::SettingsNotFound => {
                ApiError::not_found("Agency settings not found for this organization")
            }
            BackupError::OrganizationNotFound => {
                ApiError::not_found("Organization not found")
            }
            // Restore failures surface the store's message so a human can intervene
            BackupError::Restore { step, source } => {
                tracing::error!("Restore failed at step '{}': {}", step, source);
                ApiError::internal_server_error(format!("Restore failed at {}: {}", step, source))
            }
            BackupError::Database(e) => {
                tracing::error!("Backup database error: {}", e);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::services::ai::GenerateError> for ApiError {
    fn from(err: crate::services::ai::GenerateError) -> Self {
        use crate::services::ai::GenerateError;
        match &err {
            GenerateError::MissingCredential => {
                ApiError::bad_request("No API key provided and no server credential configured")
            }
            GenerateError::InvalidPromptType(t) => {
                ApiError::bad_request(format!("Unknown prompt type: {}", t))
            }
            GenerateError::CredentialRejected(msg) => {
                ApiError::unauthorized(format!("Generative API rejected credential: {}", msg))
            }
            GenerateError::Exhausted { attempts, available_models } => {
                let mut message = format!("All candidate models failed ({} attempted)", attempts);
                if let Some(models) = available_models {
                    message.push_str(&format!("; models available to this key: {}", models.join(", ")));
                }
                ApiError::internal_server_error(message)
            }
        }
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        ApiError::unauthorized(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_shape() {
        let err = ApiError::forbidden("nope");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_json(), json!({"error": "nope"}));
    }
}
