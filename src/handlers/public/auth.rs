use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Profile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub email: String,
}

/// POST /auth/register - Create an organization, its owner profile, and the
/// initial agency settings, then issue a token for the owner.
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    if payload.organization_name.trim().is_empty() {
        return Err(ApiError::bad_request("organization_name is required"));
    }
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM profiles WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(DatabaseError::from)?;
    if existing.is_some() {
        return Err(ApiError::bad_request("An account with this email already exists"));
    }

    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

    let organization_id: Uuid = sqlx::query_scalar(
        "INSERT INTO organizations (id, name, subscription_status, subscription_tier, trial_ends_at, agent_limit, created_at, updated_at)
         VALUES ($1, $2, 'trial', 'starter', NOW() + INTERVAL '14 days', 3, NOW(), NOW())
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(payload.organization_name.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(DatabaseError::from)?;

    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO profiles (id, email, organization_id, role, access, created_at)
         VALUES ($1, $2, $3, 'owner', 'full', NOW())",
    )
    .bind(user_id)
    .bind(payload.email.trim())
    .bind(organization_id)
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::from)?;

    sqlx::query(
        "INSERT INTO agency_settings (id, organization_id, onboarding_complete, agency_name, currency, created_at, updated_at)
         VALUES ($1, $2, false, $3, 'EUR', NOW(), NOW())",
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(payload.organization_name.trim())
    .execute(&mut *tx)
    .await
    .map_err(DatabaseError::from)?;

    tx.commit().await.map_err(DatabaseError::from)?;

    tracing::info!("Registered organization {} for '{}'", organization_id, payload.email);

    let token = generate_jwt(Claims::new(user_id, payload.email.clone(), "owner".to_string()))?;

    Ok(ApiResponse::created(json!({
        "token": token,
        "user_id": user_id,
        "organization_id": organization_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// POST /auth/login - Issue a token for an existing profile.
/// Credential verification itself is delegated to the identity provider in
/// front of this API; this endpoint maps a verified email to a token.
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE email = $1")
        .bind(payload.email.trim())
        .fetch_optional(&pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

    let token = generate_jwt(Claims::new(profile.id, profile.email.clone(), profile.role.clone()))?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "user_id": profile.id,
        "organization_id": profile.organization_id,
        "role": profile.role,
    })))
}
