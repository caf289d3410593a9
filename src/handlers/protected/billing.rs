use axum::{extract::Extension, response::Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Organization;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

const VALID_STATUSES: &[&str] = &["trial", "active", "past_due", "cancelled"];
const VALID_TIERS: &[&str] = &["starter", "team", "agency"];

/// GET /api/billing/subscription - Current subscription state
pub async fn get_subscription(Extension(context): Extension<TenantContext>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(context.organization_id)
        .fetch_optional(&pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    Ok(ApiResponse::success(json!({
        "subscription_status": org.subscription_status,
        "subscription_tier": org.subscription_tier,
        "trial_ends_at": org.trial_ends_at,
        "renews_at": org.renews_at,
        "agent_limit": org.agent_limit,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub status: String,
    pub tier: String,
    pub renews_at: Option<DateTime<Utc>>,
}

/// POST /api/billing/subscription - Record the outcome of a billing event
/// (the payment-provider flow itself happens outside this API). Owner only.
pub async fn update_subscription(
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Value> {
    if context.role != "owner" {
        return Err(ApiError::forbidden("Only the organization owner can change billing"));
    }
    if !VALID_STATUSES.contains(&payload.status.as_str()) {
        return Err(ApiError::bad_request(format!("Invalid status '{}'", payload.status)));
    }
    if !VALID_TIERS.contains(&payload.tier.as_str()) {
        return Err(ApiError::bad_request(format!("Invalid tier '{}'", payload.tier)));
    }

    // Tier drives the agent-count limit
    let agent_limit: i32 = match payload.tier.as_str() {
        "starter" => 3,
        "team" => 10,
        _ => 50,
    };

    let pool = DatabaseManager::pool().await?;

    sqlx::query(
        "UPDATE organizations SET
            subscription_status = $2,
            subscription_tier = $3,
            renews_at = $4,
            agent_limit = $5,
            updated_at = NOW()
         WHERE id = $1",
    )
    .bind(context.organization_id)
    .bind(&payload.status)
    .bind(&payload.tier)
    .bind(payload.renews_at)
    .bind(agent_limit)
    .execute(&pool)
    .await
    .map_err(DatabaseError::from)?;

    tracing::info!(
        "Subscription updated for {}: {} / {}",
        context.organization_id,
        payload.status,
        payload.tier
    );

    Ok(ApiResponse::success(json!({
        "subscription_status": payload.status,
        "subscription_tier": payload.tier,
        "agent_limit": agent_limit,
    })))
}
