//! Extension repository implementation
//!
//! Provisioning creates the extension and its quota ledger inside one
//! transaction, seeding the starting balance from the tenant's first quota.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helios_core::{
    models::{Extension, UserQuota},
    traits::ExtensionRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

/// PostgreSQL implementation of ExtensionRepository
pub struct PgExtensionRepository {
    pool: PgPool,
}

impl PgExtensionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExtensionRepository for PgExtensionRepository {
    #[instrument(skip(self))]
    async fn find(&self, tenant_id: i64, extension: &str) -> AppResult<Option<Extension>> {
        debug!("Finding extension {} for tenant {}", extension, tenant_id);

        let result = sqlx::query_as::<sqlx::Postgres, ExtensionRow>(
            r#"
            SELECT id, tenant_id, extension, name, created_at
            FROM extensions
            WHERE tenant_id = $1 AND extension = $2
            "#,
        )
        .bind(tenant_id)
        .bind(extension)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding extension {}: {}", extension, e);
            AppError::Database(format!("Failed to find extension: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn provision(
        &self,
        tenant_id: i64,
        extension: &str,
        name: Option<&str>,
    ) -> AppResult<(Extension, UserQuota)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start provisioning transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let ext_row = sqlx::query_as::<sqlx::Postgres, ExtensionRow>(
            r#"
            INSERT INTO extensions (tenant_id, extension, name)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, extension, name, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(extension)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating extension {}: {}", extension, e);
            AppError::Database(format!("Failed to create extension: {}", e))
        })?;

        // Seed the ledger from the tenant's first quota; with none defined
        // the balance starts at zero and never refills.
        let default_quota: Option<(i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT id, amount
            FROM quotas
            WHERE tenant_id = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error finding default quota: {}", e);
            AppError::Database(format!("Failed to find default quota: {}", e))
        })?;

        let (quota_id, initial_balance) = match default_quota {
            Some((id, amount)) => (Some(id), amount),
            None => (None, Decimal::ZERO),
        };

        let quota_row = sqlx::query_as::<sqlx::Postgres, UserQuotaInsertRow>(
            r#"
            INSERT INTO user_quotas (extension_id, quota_id, remaining_balance, last_reset)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, extension_id, quota_id, remaining_balance, last_reset
            "#,
        )
        .bind(ext_row.id)
        .bind(quota_id)
        .bind(initial_balance)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating user quota: {}", e);
            AppError::Database(format!("Failed to create user quota: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit provisioning transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            tenant_id,
            extension,
            initial_balance = %initial_balance,
            "extension provisioned"
        );

        let quota_amount = quota_id.map(|_| initial_balance);
        Ok((
            ext_row.into(),
            UserQuota {
                id: quota_row.id,
                extension_id: quota_row.extension_id,
                quota_id: quota_row.quota_id,
                quota_amount,
                remaining_balance: quota_row.remaining_balance,
                last_reset: quota_row.last_reset,
            },
        ))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ExtensionRow {
    id: i64,
    tenant_id: i64,
    extension: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ExtensionRow> for Extension {
    fn from(row: ExtensionRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            extension: row.extension,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserQuotaInsertRow {
    id: i64,
    extension_id: i64,
    quota_id: Option<i64>,
    remaining_balance: Decimal,
    last_reset: DateTime<Utc>,
}
