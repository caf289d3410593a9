use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::models::{Agent, AgencySettings, Assignment, Organization, Transaction};

/// Literal version tag carried by every snapshot
pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    #[error("Backup belongs to a different organization")]
    TenantMismatch,

    #[error("Agency settings not found")]
    SettingsNotFound,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Restore failed at step '{step}': {source}")]
    Restore {
        step: &'static str,
        source: sqlx::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub exported_at: DateTime<Utc>,
    pub exported_by: String,
    pub version: String,
}

/// Versioned point-in-time export of one tenant's business data.
/// Transient value object: produced by export, consumed only by restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub metadata: BackupMetadata,
    pub organization: Organization,
    pub settings: AgencySettings,
    pub agents: Vec<Agent>,
    pub transactions: Vec<Transaction>,
    pub assignments: Vec<Assignment>,
}

impl BackupSnapshot {
    /// Fail-fast validation of a raw restore body. Runs entirely before any
    /// database work so a rejected snapshot performs zero mutations.
    ///
    /// Order matters: structural checks (InvalidFormat) come before the
    /// tenant boundary check (TenantMismatch).
    pub fn validate(body: &Value, organization_id: Uuid) -> Result<BackupSnapshot, BackupError> {
        for key in ["metadata", "organization", "settings"] {
            if body.get(key).is_none() {
                return Err(BackupError::InvalidFormat(format!(
                    "missing required key '{}'",
                    key
                )));
            }
        }

        let snapshot: BackupSnapshot = serde_json::from_value(body.clone())
            .map_err(|e| BackupError::InvalidFormat(e.to_string()))?;

        // Hard boundary: a snapshot may only ever be restored into the
        // organization it was exported from.
        if snapshot.organization.id != organization_id {
            return Err(BackupError::TenantMismatch);
        }

        Ok(snapshot)
    }
}

#[derive(Debug, Serialize)]
pub struct RestoreSummary {
    pub agents: usize,
    pub assignments: usize,
    pub transactions: usize,
}

pub struct BackupService {
    pool: PgPool,
}

impl BackupService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Export a complete snapshot of one organization's mutable business data.
    ///
    /// The five reads are issued concurrently and joined; no cross-table
    /// transaction is taken, so consistency extends only as far as the reads
    /// being issued close together.
    pub async fn export(
        &self,
        organization_id: Uuid,
        exported_by: &str,
    ) -> Result<BackupSnapshot, BackupError> {
        let (organization, settings, agents, transactions, assignments) = tokio::try_join!(
            self.fetch_organization(organization_id),
            self.fetch_settings(organization_id),
            self.fetch_agents(organization_id),
            self.fetch_transactions(organization_id),
            self.fetch_assignments(organization_id),
        )?;

        let organization = organization.ok_or(BackupError::OrganizationNotFound)?;
        let settings = settings.ok_or(BackupError::SettingsNotFound)?;

        self.stamp_last_backup(organization_id).await;

        info!(
            "Exported backup for organization {} ({} agents, {} transactions, {} assignments)",
            organization_id,
            agents.len(),
            transactions.len(),
            assignments.len()
        );

        Ok(BackupSnapshot {
            metadata: BackupMetadata {
                exported_at: Utc::now(),
                exported_by: exported_by.to_string(),
                version: SNAPSHOT_VERSION.to_string(),
            },
            organization,
            settings,
            agents,
            transactions,
            assignments,
        })
    }

    /// Best-effort timestamp stamp; never aborts the export. An undefined
    /// column (Postgres 42703) is the expected backward-compatible-schema
    /// case; anything else still warrants a warning.
    async fn stamp_last_backup(&self, organization_id: Uuid) {
        let result = sqlx::query(
            "UPDATE agency_settings SET last_backup_at = NOW() WHERE organization_id = $1",
        )
        .bind(organization_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let undefined_column = matches!(
                &e,
                sqlx::Error::Database(db) if db.code().as_deref() == Some("42703")
            );
            if undefined_column {
                debug!("last_backup_at column absent (older schema), skipping stamp");
            } else {
                warn!("Failed to stamp last_backup_at for {}: {}", organization_id, e);
            }
        }
    }

    /// Replace the organization's business data with a snapshot's contents.
    ///
    /// The snapshot must already have passed [`BackupSnapshot::validate`] for
    /// the same organization id. All steps run in one transaction: a failure
    /// at any point rolls the whole restore back. Delete order respects
    /// foreign keys (transactions and assignments reference agents).
    pub async fn restore(
        &self,
        organization_id: Uuid,
        snapshot: BackupSnapshot,
    ) -> Result<RestoreSummary, BackupError> {
        let mut tx = self.pool.begin().await?;

        for (step, table) in [
            ("delete transactions", "transactions"),
            ("delete assignments", "assignments"),
            ("delete agents", "agents"),
        ] {
            let query = format!("DELETE FROM {} WHERE organization_id = $1", table);
            sqlx::query(&query)
                .bind(organization_id)
                .execute(&mut *tx)
                .await
                .map_err(|source| BackupError::Restore { step, source })?;
            debug!("Restore step complete: {}", step);
        }

        for agent in &snapshot.agents {
            sqlx::query(
                "INSERT INTO agents (id, organization_id, name, email, phone, commission_rate, active, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(agent.id)
            .bind(organization_id)
            .bind(&agent.name)
            .bind(&agent.email)
            .bind(&agent.phone)
            .bind(agent.commission_rate)
            .bind(agent.active)
            .bind(agent.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|source| BackupError::Restore { step: "insert agents", source })?;
        }

        for assignment in &snapshot.assignments {
            sqlx::query(
                "INSERT INTO assignments (id, organization_id, agent_id, case_reference, status, assigned_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(assignment.id)
            .bind(organization_id)
            .bind(assignment.agent_id)
            .bind(&assignment.case_reference)
            .bind(&assignment.status)
            .bind(assignment.assigned_at)
            .execute(&mut *tx)
            .await
            .map_err(|source| BackupError::Restore { step: "insert assignments", source })?;
        }

        for transaction in &snapshot.transactions {
            sqlx::query(
                "INSERT INTO transactions (id, organization_id, agent_id, amount, kind, category, description, occurred_at, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(transaction.id)
            .bind(organization_id)
            .bind(transaction.agent_id)
            .bind(transaction.amount)
            .bind(&transaction.kind)
            .bind(&transaction.category)
            .bind(&transaction.description)
            .bind(transaction.occurred_at)
            .bind(transaction.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|source| BackupError::Restore { step: "insert transactions", source })?;
        }

        // Settings upsert is keyed by organization_id and forces the parent
        // id, so a doctored snapshot can never re-parent the row.
        let settings = &snapshot.settings;
        sqlx::query(
            "INSERT INTO agency_settings (id, organization_id, onboarding_complete, agency_name, phone, address, currency, last_backup_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
             ON CONFLICT (organization_id) DO UPDATE SET
                onboarding_complete = EXCLUDED.onboarding_complete,
                agency_name = EXCLUDED.agency_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                currency = EXCLUDED.currency,
                last_backup_at = EXCLUDED.last_backup_at,
                updated_at = NOW()",
        )
        .bind(settings.id)
        .bind(organization_id)
        .bind(settings.onboarding_complete)
        .bind(&settings.agency_name)
        .bind(&settings.phone)
        .bind(&settings.address)
        .bind(&settings.currency)
        .bind(settings.last_backup_at)
        .bind(settings.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|source| BackupError::Restore { step: "upsert settings", source })?;

        // Organization fields come back from the snapshot; the id never changes.
        let org = &snapshot.organization;
        sqlx::query(
            "UPDATE organizations SET
                name = $2,
                subscription_status = $3,
                subscription_tier = $4,
                trial_ends_at = $5,
                renews_at = $6,
                agent_limit = $7,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(organization_id)
        .bind(&org.name)
        .bind(&org.subscription_status)
        .bind(&org.subscription_tier)
        .bind(org.trial_ends_at)
        .bind(org.renews_at)
        .bind(org.agent_limit)
        .execute(&mut *tx)
        .await
        .map_err(|source| BackupError::Restore { step: "update organization", source })?;

        tx.commit().await?;

        let summary = RestoreSummary {
            agents: snapshot.agents.len(),
            assignments: snapshot.assignments.len(),
            transactions: snapshot.transactions.len(),
        };

        info!(
            "Restored backup into organization {} ({} agents, {} assignments, {} transactions)",
            organization_id, summary.agents, summary.assignments, summary.transactions
        );

        Ok(summary)
    }

    async fn fetch_organization(&self, id: Uuid) -> Result<Option<Organization>, BackupError> {
        let row = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn fetch_settings(&self, organization_id: Uuid) -> Result<Option<AgencySettings>, BackupError> {
        let row = sqlx::query_as::<_, AgencySettings>(
            "SELECT * FROM agency_settings WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>, BackupError> {
        let rows = sqlx::query_as::<_, Agent>(
            "SELECT * FROM agents WHERE organization_id = $1 ORDER BY created_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_transactions(&self, organization_id: Uuid) -> Result<Vec<Transaction>, BackupError> {
        let rows = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE organization_id = $1 ORDER BY occurred_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_assignments(&self, organization_id: Uuid) -> Result<Vec<Assignment>, BackupError> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE organization_id = $1 ORDER BY assigned_at",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot_value(org_id: Uuid) -> Value {
        let now = Utc::now();
        json!({
            "metadata": {
                "exported_at": now,
                "exported_by": "owner@example.com",
                "version": SNAPSHOT_VERSION,
            },
            "organization": {
                "id": org_id,
                "name": "Example Realty",
                "subscription_status": "active",
                "subscription_tier": "pro",
                "trial_ends_at": null,
                "renews_at": null,
                "agent_limit": 10,
                "created_at": now,
                "updated_at": now,
            },
            "settings": {
                "id": Uuid::new_v4(),
                "organization_id": org_id,
                "onboarding_complete": true,
                "agency_name": "Example Realty",
                "phone": null,
                "address": null,
                "currency": "EUR",
                "last_backup_at": null,
                "created_at": now,
                "updated_at": now,
            },
            "agents": [],
            "transactions": [],
            "assignments": [],
        })
    }

    #[test]
    fn validate_accepts_matching_tenant() {
        let org_id = Uuid::new_v4();
        let body = sample_snapshot_value(org_id);
        let snapshot = BackupSnapshot::validate(&body, org_id).unwrap();
        assert_eq!(snapshot.organization.id, org_id);
        assert_eq!(snapshot.metadata.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn validate_rejects_missing_keys() {
        let org_id = Uuid::new_v4();
        for key in ["metadata", "organization", "settings"] {
            let mut body = sample_snapshot_value(org_id);
            body.as_object_mut().unwrap().remove(key);
            match BackupSnapshot::validate(&body, org_id) {
                Err(BackupError::InvalidFormat(msg)) => assert!(msg.contains(key)),
                other => panic!("expected InvalidFormat, got {:?}", other),
            }
        }
    }

    #[test]
    fn validate_rejects_foreign_tenant() {
        let body = sample_snapshot_value(Uuid::new_v4());
        let err = BackupSnapshot::validate(&body, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BackupError::TenantMismatch));
    }

    #[test]
    fn validate_rejects_malformed_rows() {
        let org_id = Uuid::new_v4();
        let mut body = sample_snapshot_value(org_id);
        body["agents"] = json!([{"id": "not-a-uuid"}]);
        assert!(matches!(
            BackupSnapshot::validate(&body, org_id),
            Err(BackupError::InvalidFormat(_))
        ));
    }
}
