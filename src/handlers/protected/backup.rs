use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};
use crate::services::backup::{BackupService, BackupSnapshot};

/// GET /api/backup/export - Download a snapshot of the organization's data
/// as a dated JSON file.
pub async fn export(Extension(context): Extension<TenantContext>) -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let service = BackupService::new(pool);

    let snapshot = service.export(context.organization_id, &context.email).await?;

    let filename = format!("agency-backup-{}.json", Utc::now().format("%Y-%m-%d"));
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Json(snapshot),
    )
        .into_response())
}

/// POST /api/backup/restore - Replace the organization's data with a
/// previously exported snapshot. Validation runs before any mutation; the
/// wipe-and-replace itself is transactional.
pub async fn restore(
    Extension(context): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let snapshot = BackupSnapshot::validate(&body, context.organization_id)?;

    let pool = DatabaseManager::pool().await?;
    let service = BackupService::new(pool);

    let summary = service.restore(context.organization_id, snapshot).await?;

    Ok(ApiResponse::success(json!({
        "success": true,
        "message": format!(
            "Restore complete: {} agents, {} assignments, {} transactions",
            summary.agents, summary.assignments, summary.transactions
        ),
    })))
}
