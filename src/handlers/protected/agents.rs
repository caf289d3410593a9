use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde::Deserialize;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Agent;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

/// GET /api/agents - List the organization's team roster
pub async fn list(Extension(context): Extension<TenantContext>) -> ApiResult<Vec<Agent>> {
    let pool = DatabaseManager::pool().await?;

    let agents = sqlx::query_as::<_, Agent>(
        "SELECT * FROM agents WHERE organization_id = $1 ORDER BY created_at",
    )
    .bind(context.organization_id)
    .fetch_all(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::success(agents))
}

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub commission_rate: Option<Decimal>,
}

/// POST /api/agents - Add a team member, enforcing the subscription's
/// agent-count limit.
pub async fn create(
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<CreateAgentRequest>,
) -> ApiResult<Agent> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Agent name is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let (count, limit): (i64, i32) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM agents WHERE organization_id = $1), agent_limit
         FROM organizations WHERE id = $1",
    )
    .bind(context.organization_id)
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::from)?;

    if count >= limit as i64 {
        return Err(ApiError::forbidden(format!(
            "Agent limit reached for this subscription ({} of {})",
            count, limit
        )));
    }

    let agent = sqlx::query_as::<_, Agent>(
        "INSERT INTO agents (id, organization_id, name, email, phone, commission_rate, active, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, true, NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(context.organization_id)
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.commission_rate)
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::created(agent))
}

/// GET /api/agents/:id
pub async fn get(
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Agent> {
    let pool = DatabaseManager::pool().await?;

    let agent = sqlx::query_as::<_, Agent>(
        "SELECT * FROM agents WHERE id = $1 AND organization_id = $2",
    )
    .bind(id)
    .bind(context.organization_id)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    Ok(ApiResponse::success(agent))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub commission_rate: Option<Decimal>,
    pub active: Option<bool>,
}

/// PUT /api/agents/:id
pub async fn update(
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAgentRequest>,
) -> ApiResult<Agent> {
    let pool = DatabaseManager::pool().await?;

    let agent = sqlx::query_as::<_, Agent>(
        "UPDATE agents SET
            name = COALESCE($3, name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            commission_rate = COALESCE($6, commission_rate),
            active = COALESCE($7, active)
         WHERE id = $1 AND organization_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(context.organization_id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.commission_rate)
    .bind(payload.active)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    Ok(ApiResponse::success(agent))
}

/// DELETE /api/agents/:id
pub async fn delete(
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM agents WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(context.organization_id)
        .execute(&pool)
        .await
        .map_err(DatabaseError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Agent not found"));
    }

    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
