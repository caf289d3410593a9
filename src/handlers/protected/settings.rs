use axum::{extract::Extension, response::Json};
use serde::Deserialize;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::AgencySettings;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

/// GET /api/settings
pub async fn get(Extension(context): Extension<TenantContext>) -> ApiResult<AgencySettings> {
    let pool = DatabaseManager::pool().await?;

    let settings = sqlx::query_as::<_, AgencySettings>(
        "SELECT * FROM agency_settings WHERE organization_id = $1",
    )
    .bind(context.organization_id)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("Agency settings not found"))?;

    Ok(ApiResponse::success(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub agency_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: Option<String>,
}

/// PUT /api/settings - Update business metadata; completing this step marks
/// onboarding as done.
pub async fn update(
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> ApiResult<AgencySettings> {
    let pool = DatabaseManager::pool().await?;

    let settings = sqlx::query_as::<_, AgencySettings>(
        "UPDATE agency_settings SET
            agency_name = COALESCE($2, agency_name),
            phone = COALESCE($3, phone),
            address = COALESCE($4, address),
            currency = COALESCE($5, currency),
            onboarding_complete = true,
            updated_at = NOW()
         WHERE organization_id = $1
         RETURNING *",
    )
    .bind(context.organization_id)
    .bind(&payload.agency_name)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(&payload.currency)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| ApiError::not_found("Agency settings not found"))?;

    Ok(ApiResponse::success(settings))
}
