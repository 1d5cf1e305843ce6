//! Call record repository implementation
//!
//! The routing triple is stored flat (from/to/final number, DN, type, and
//! display name columns) the way the PBX reports it; the row mapper folds
//! the columns back into the `Routing` struct.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helios_core::{
    models::{CallCategory, CallRecord, CallRecordDraft, RouteLeg, Routing},
    traits::CallRecordRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{debug, error, instrument};

const RECORD_COLUMNS: &str = r#"
    id, tenant_id, caller, callee, call_time, external_number, country,
    duration, time_answered, time_end,
    reason_terminated, reason_changed, missed_queue_calls,
    from_no, to_no, to_dn, final_number, final_dn,
    from_type, to_type, final_type,
    from_dispname, to_dispname, final_dispname,
    call_category, call_rate, total_cost, quota_exceeded, created_at
"#;

/// PostgreSQL implementation of CallRecordRepository
pub struct PgCallRecordRepository {
    pool: PgPool,
}

impl PgCallRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRecordRepository for PgCallRecordRepository {
    #[instrument(skip(self, draft))]
    async fn create(&self, draft: &CallRecordDraft) -> AppResult<CallRecord> {
        debug!(
            "Creating call record {:?} -> {}",
            draft.caller, draft.callee
        );

        let query = format!(
            r#"
            INSERT INTO call_records (
                tenant_id, caller, callee, call_time, external_number, country,
                duration, time_answered, time_end,
                reason_terminated, reason_changed, missed_queue_calls,
                from_no, to_no, to_dn, final_number, final_dn,
                from_type, to_type, final_type,
                from_dispname, to_dispname, final_dispname,
                call_category, call_rate, total_cost, quota_exceeded
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
            )
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<sqlx::Postgres, CallRecordRow>(&query)
            .bind(draft.tenant_id)
            .bind(&draft.caller)
            .bind(&draft.callee)
            .bind(draft.call_time)
            .bind(&draft.external_number)
            .bind(&draft.country)
            .bind(draft.duration)
            .bind(draft.time_answered)
            .bind(draft.time_end)
            .bind(&draft.reason_terminated)
            .bind(&draft.reason_changed)
            .bind(&draft.missed_queue_calls)
            .bind(&draft.routing.from.number)
            .bind(&draft.routing.to.number)
            .bind(&draft.routing.to.dn)
            .bind(&draft.routing.final_leg.number)
            .bind(&draft.routing.final_leg.dn)
            .bind(&draft.routing.from.leg_type)
            .bind(&draft.routing.to.leg_type)
            .bind(&draft.routing.final_leg.leg_type)
            .bind(&draft.routing.from.display_name)
            .bind(&draft.routing.to.display_name)
            .bind(&draft.routing.final_leg.display_name)
            .bind(draft.call_category.as_str())
            .bind(draft.call_rate)
            .bind(draft.total_cost)
            .bind(draft.quota_exceeded)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error creating call record: {}", e);
                AppError::Database(format!("Failed to create call record: {}", e))
            })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<CallRecord>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM call_records WHERE id = $1");

        let result = sqlx::query_as::<sqlx::Postgres, CallRecordRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding call record {}: {}", id, e);
                AppError::Database(format!("Failed to find call record: {}", e))
            })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_for_tenant(
        &self,
        tenant_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<CallRecord>> {
        let query = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM call_records
            WHERE tenant_id = $1
            ORDER BY call_time DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<sqlx::Postgres, CallRecordRow>(&query)
            .bind(tenant_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Database error listing call records for tenant {}: {}",
                    tenant_id, e
                );
                AppError::Database(format!("Failed to list call records: {}", e))
            })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_rating(
        &self,
        id: i64,
        country: &str,
        category: CallCategory,
        rate: Decimal,
        cost: Decimal,
    ) -> AppResult<CallRecord> {
        let query = format!(
            r#"
            UPDATE call_records
            SET country = $2,
                call_category = $3,
                call_rate = $4,
                total_cost = $5
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<sqlx::Postgres, CallRecordRow>(&query)
            .bind(id)
            .bind(country)
            .bind(category.as_str())
            .bind(rate)
            .bind(cost)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error re-rating call record {}: {}", id, e);
                AppError::Database(format!("Failed to update call record: {}", e))
            })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn set_quota_flag(&self, id: i64, exceeded: bool) -> AppResult<()> {
        sqlx::query("UPDATE call_records SET quota_exceeded = $2 WHERE id = $1")
            .bind(id)
            .bind(exceeded)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error flagging call record {}: {}", id, e);
                AppError::Database(format!("Failed to flag call record: {}", e))
            })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CallRecordRow {
    id: i64,
    tenant_id: Option<i64>,
    caller: Option<String>,
    callee: String,
    call_time: DateTime<Utc>,
    external_number: String,
    country: String,
    duration: Option<i64>,
    time_answered: Option<DateTime<Utc>>,
    time_end: Option<DateTime<Utc>>,
    reason_terminated: String,
    reason_changed: String,
    missed_queue_calls: String,
    from_no: String,
    to_no: String,
    to_dn: String,
    final_number: String,
    final_dn: String,
    from_type: String,
    to_type: String,
    final_type: String,
    from_dispname: String,
    to_dispname: String,
    final_dispname: String,
    call_category: String,
    call_rate: Decimal,
    total_cost: Decimal,
    quota_exceeded: bool,
    created_at: DateTime<Utc>,
}

impl From<CallRecordRow> for CallRecord {
    fn from(row: CallRecordRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            caller: row.caller,
            callee: row.callee,
            call_time: row.call_time,
            external_number: row.external_number,
            duration: row.duration,
            time_answered: row.time_answered,
            time_end: row.time_end,
            reason_terminated: row.reason_terminated,
            reason_changed: row.reason_changed,
            missed_queue_calls: row.missed_queue_calls,
            routing: Routing {
                from: RouteLeg {
                    number: row.from_no,
                    dn: String::new(),
                    leg_type: row.from_type,
                    display_name: row.from_dispname,
                },
                to: RouteLeg {
                    number: row.to_no,
                    dn: row.to_dn,
                    leg_type: row.to_type,
                    display_name: row.to_dispname,
                },
                final_leg: RouteLeg {
                    number: row.final_number,
                    dn: row.final_dn,
                    leg_type: row.final_type,
                    display_name: row.final_dispname,
                },
            },
            country: row.country,
            call_category: CallCategory::from_str(&row.call_category)
                .unwrap_or(CallCategory::Unknown),
            call_rate: row.call_rate,
            total_cost: row.total_cost,
            quota_exceeded: row.quota_exceeded,
            created_at: row.created_at,
        }
    }
}
