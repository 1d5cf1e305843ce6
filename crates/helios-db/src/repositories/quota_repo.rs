//! Quota repository implementation
//!
//! The deduction is a single balance-guarded UPDATE: the row is the unit of
//! mutual exclusion, so two concurrent deductions against the same ledger
//! can never both pass the check, and unrelated extensions never serialize
//! on anything shared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helios_core::{models::UserQuota, traits::QuotaRepository, AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of QuotaRepository
pub struct PgQuotaRepository {
    pool: PgPool,
}

impl PgQuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaRepository for PgQuotaRepository {
    #[instrument(skip(self))]
    async fn get_for_extension(
        &self,
        tenant_id: i64,
        extension: &str,
    ) -> AppResult<Option<UserQuota>> {
        debug!("Finding quota ledger for extension {}", extension);

        let result = sqlx::query_as::<sqlx::Postgres, UserQuotaRow>(
            r#"
            SELECT
                uq.id, uq.extension_id, uq.quota_id,
                q.amount AS quota_amount,
                uq.remaining_balance, uq.last_reset
            FROM user_quotas uq
            JOIN extensions e ON e.id = uq.extension_id
            LEFT JOIN quotas q ON q.id = uq.quota_id
            WHERE e.tenant_id = $1 AND e.extension = $2
            "#,
        )
        .bind(tenant_id)
        .bind(extension)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding quota for {}: {}", extension, e);
            AppError::Database(format!("Failed to find quota: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn try_deduct(&self, user_quota_id: i64, amount: Decimal) -> AppResult<bool> {
        // The WHERE clause carries the overdraft check; zero rows affected
        // means the balance was insufficient and nothing changed.
        let result = sqlx::query(
            r#"
            UPDATE user_quotas
            SET remaining_balance = remaining_balance - $2
            WHERE id = $1 AND remaining_balance >= $2
            "#,
        )
        .bind(user_quota_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error deducting from quota {}: {}",
                user_quota_id, e
            );
            AppError::Database(format!("Failed to deduct balance: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn credit(&self, user_quota_id: i64, amount: Decimal) -> AppResult<Decimal> {
        let result: (Decimal,) = sqlx::query_as(
            r#"
            UPDATE user_quotas
            SET remaining_balance = remaining_balance + $2
            WHERE id = $1
            RETURNING remaining_balance
            "#,
        )
        .bind(user_quota_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error crediting quota {}: {}", user_quota_id, e);
            AppError::Database(format!("Failed to credit balance: {}", e))
        })?;

        Ok(result.0)
    }

    #[instrument(skip(self))]
    async fn reset_balance(
        &self,
        user_quota_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE user_quotas
            SET remaining_balance = $2,
                last_reset = $3
            WHERE id = $1
            "#,
        )
        .bind(user_quota_id)
        .bind(amount)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error resetting quota {}: {}", user_quota_id, e);
            AppError::Database(format!("Failed to reset balance: {}", e))
        })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct UserQuotaRow {
    id: i64,
    extension_id: i64,
    quota_id: Option<i64>,
    quota_amount: Option<Decimal>,
    remaining_balance: Decimal,
    last_reset: DateTime<Utc>,
}

impl From<UserQuotaRow> for UserQuota {
    fn from(row: UserQuotaRow) -> Self {
        Self {
            id: row.id,
            extension_id: row.extension_id,
            quota_id: row.quota_id,
            quota_amount: row.quota_amount,
            remaining_balance: row.remaining_balance,
            last_reset: row.last_reset,
        }
    }
}
