use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant root. Every business record belongs to exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub subscription_status: String,
    pub subscription_tier: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub renews_at: Option<DateTime<Utc>>,
    pub agent_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user identity bound to its current organization plus a role.
/// A user may belong to multiple organizations over time but acts within
/// exactly one at a time; this row holds the current binding.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<Uuid>,
    pub role: String,
    pub access: String,
    pub created_at: DateTime<Utc>,
}

/// One-to-one with Organization; overwritten wholesale on restore.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgencySettings {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub onboarding_complete: bool,
    pub agency_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency: String,
    pub last_backup_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Team member metadata row, tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub commission_rate: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Links an agent to a case, tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub agent_id: Uuid,
    pub case_reference: String,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
}

/// Financial ledger entry, tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub amount: Decimal,
    pub kind: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
