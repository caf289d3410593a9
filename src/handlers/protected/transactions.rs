use axum::{
    extract::{Extension, Path},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Transaction;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, TenantContext};

/// GET /api/transactions - The organization's ledger, newest first
pub async fn list(Extension(context): Extension<TenantContext>) -> ApiResult<Vec<Transaction>> {
    let pool = DatabaseManager::pool().await?;

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE organization_id = $1 ORDER BY occurred_at DESC",
    )
    .bind(context.organization_id)
    .fetch_all(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::success(transactions))
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: Decimal,
    pub kind: String,
    pub agent_id: Option<Uuid>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// POST /api/transactions - Record a ledger entry
pub async fn create(
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<CreateTransactionRequest>,
) -> ApiResult<Transaction> {
    if payload.kind != "income" && payload.kind != "expense" {
        return Err(ApiError::bad_request("kind must be 'income' or 'expense'"));
    }

    let pool = DatabaseManager::pool().await?;

    let transaction = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (id, organization_id, agent_id, amount, kind, category, description, occurred_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(context.organization_id)
    .bind(payload.agent_id)
    .bind(payload.amount)
    .bind(&payload.kind)
    .bind(&payload.category)
    .bind(&payload.description)
    .bind(payload.occurred_at.unwrap_or_else(Utc::now))
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::created(transaction))
}

/// DELETE /api/transactions/:id
pub async fn delete(
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(context.organization_id)
        .execute(&pool)
        .await
        .map_err(DatabaseError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Transaction not found"));
    }

    Ok(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
