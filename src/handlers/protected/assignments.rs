use axum::{extract::Extension, response::Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Assignment;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

/// GET /api/assignments
pub async fn list(Extension(context): Extension<TenantContext>) -> ApiResult<Vec<Assignment>> {
    let pool = DatabaseManager::pool().await?;

    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE organization_id = $1 ORDER BY assigned_at DESC",
    )
    .bind(context.organization_id)
    .fetch_all(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::success(assignments))
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub agent_id: Uuid,
    pub case_reference: String,
}

/// POST /api/assignments - Link an agent to a case. The agent must belong to
/// the caller's organization.
pub async fn create(
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> ApiResult<Assignment> {
    if payload.case_reference.trim().is_empty() {
        return Err(ApiError::bad_request("case_reference is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let agent_exists: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM agents WHERE id = $1 AND organization_id = $2",
    )
    .bind(payload.agent_id)
    .bind(context.organization_id)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?;

    if agent_exists.is_none() {
        return Err(ApiError::not_found("Agent not found in this organization"));
    }

    let assignment = sqlx::query_as::<_, Assignment>(
        "INSERT INTO assignments (id, organization_id, agent_id, case_reference, status, assigned_at)
         VALUES ($1, $2, $3, $4, 'active', NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(context.organization_id)
    .bind(payload.agent_id)
    .bind(payload.case_reference.trim())
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::created(assignment))
}
