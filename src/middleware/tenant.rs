use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// Resolved tenant context, injected by middleware and consumed by every
/// tenant-scoped handler. Passed explicitly, never held as ambient state.
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

/// Middleware that resolves the authenticated user's current organization
/// from the profiles table. Fails 404 when the profile exists without an
/// organization binding (e.g., onboarding never completed).
pub async fn resolve_tenant_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| reject(ApiError::unauthorized("Authentication required before tenant resolution")))?
        .clone();

    let pool = DatabaseManager::pool().await.map_err(|e| {
        let api_error: ApiError = e.into();
        reject(api_error)
    })?;

    let organization_id: Option<Option<Uuid>> = sqlx::query_scalar(
        "SELECT organization_id FROM profiles WHERE id = $1",
    )
    .bind(auth_user.user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error resolving tenant for user {}: {}", auth_user.user_id, e);
        reject(ApiError::internal_server_error("Failed to resolve organization"))
    })?;

    let organization_id = organization_id.flatten().ok_or_else(|| {
        tracing::warn!("Tenant resolution failed: user '{}' has no organization binding", auth_user.email);
        reject(ApiError::not_found("No organization found for this account"))
    })?;

    tracing::debug!("Resolved tenant {} for user '{}'", organization_id, auth_user.email);

    let context = TenantContext {
        organization_id,
        user_id: auth_user.user_id,
        email: auth_user.email,
        role: auth_user.role,
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

fn reject(api_error: ApiError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(api_error.to_json()),
    )
}
