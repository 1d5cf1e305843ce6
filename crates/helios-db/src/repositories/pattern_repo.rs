//! Call pattern repository implementation
//!
//! Patterns come back in the tenant-defined order; the matcher trusts that
//! order and never re-sorts.

use async_trait::async_trait;
use helios_core::{
    models::{CallCategory, CallPattern},
    traits::PatternRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of PatternRepository
pub struct PgPatternRepository {
    pool: PgPool,
}

impl PgPatternRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatternRepository for PgPatternRepository {
    #[instrument(skip(self))]
    async fn list_for_tenant(&self, tenant_id: i64) -> AppResult<Vec<CallPattern>> {
        debug!("Listing call patterns for tenant {}", tenant_id);

        let rows = sqlx::query_as::<sqlx::Postgres, CallPatternRow>(
            r#"
            SELECT id, tenant_id, pattern, call_type, rate_per_min, description, position
            FROM call_patterns
            WHERE tenant_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error listing patterns for tenant {}: {}",
                tenant_id, e
            );
            AppError::Database(format!("Failed to list patterns: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CallPatternRow {
    id: i64,
    tenant_id: i64,
    pattern: String,
    call_type: String,
    rate_per_min: Decimal,
    description: Option<String>,
    position: i32,
}

impl From<CallPatternRow> for CallPattern {
    fn from(row: CallPatternRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            pattern: row.pattern,
            call_type: CallCategory::from_str(&row.call_type).unwrap_or(CallCategory::Unknown),
            rate_per_min: row.rate_per_min,
            description: row.description,
            position: row.position,
        }
    }
}
