//! Repository traits for the persistence collaborators
//!
//! Storage is an external collaborator: the rating pipeline only ever talks
//! to these traits. The PostgreSQL implementations live in `helios-db`;
//! tests substitute in-memory implementations.

use crate::error::AppError;
use crate::models::{CallCategory, CallPattern, CallRecord, CallRecordDraft, Extension, UserQuota};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Call record storage
#[async_trait]
pub trait CallRecordRepository: Send + Sync {
    /// Persist a fully derived draft as a new record
    async fn create(&self, draft: &CallRecordDraft) -> Result<CallRecord, AppError>;

    /// Find a record by ID
    async fn find_by_id(&self, id: i64) -> Result<Option<CallRecord>, AppError>;

    /// List records for a tenant, newest first
    async fn list_for_tenant(
        &self,
        tenant_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CallRecord>, AppError>;

    /// Overwrite the derived rating fields of an existing record
    ///
    /// Only the explicit re-rate job calls this; the ledger delta is the
    /// caller's responsibility.
    async fn update_rating(
        &self,
        id: i64,
        country: &str,
        category: CallCategory,
        rate: Decimal,
        cost: Decimal,
    ) -> Result<CallRecord, AppError>;

    /// Flag or clear the quota-exceeded marker on a record
    async fn set_quota_flag(&self, id: i64, exceeded: bool) -> Result<(), AppError>;
}

/// Call pattern storage (read-only to the rating path)
#[async_trait]
pub trait PatternRepository: Send + Sync {
    /// The tenant's patterns in stored order
    async fn list_for_tenant(&self, tenant_id: i64) -> Result<Vec<CallPattern>, AppError>;
}

/// Quota ledger storage
///
/// `try_deduct` is the atomic read-check-write: the implementation must
/// guarantee that two concurrent deductions against the same row cannot both
/// pass the balance check (row-level lock or guarded UPDATE).
#[async_trait]
pub trait QuotaRepository: Send + Sync {
    /// Ledger row for an extension, by tenant and extension string
    async fn get_for_extension(
        &self,
        tenant_id: i64,
        extension: &str,
    ) -> Result<Option<UserQuota>, AppError>;

    /// Atomically deduct `amount` if the balance covers it
    ///
    /// Returns false (without mutating) when the balance is insufficient.
    async fn try_deduct(&self, user_quota_id: i64, amount: Decimal) -> Result<bool, AppError>;

    /// Atomically add `amount`, returning the new balance
    async fn credit(&self, user_quota_id: i64, amount: Decimal) -> Result<Decimal, AppError>;

    /// Reset the balance to the full allowance and stamp `last_reset`
    async fn reset_balance(
        &self,
        user_quota_id: i64,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Extension storage and provisioning
#[async_trait]
pub trait ExtensionRepository: Send + Sync {
    /// Find an extension by tenant and extension string
    async fn find(&self, tenant_id: i64, extension: &str)
        -> Result<Option<Extension>, AppError>;

    /// Create an extension together with its quota ledger, transactionally
    ///
    /// The ledger is seeded from the tenant's first quota; with no quota
    /// defined the ledger starts at zero and never refills.
    async fn provision(
        &self,
        tenant_id: i64,
        extension: &str,
        name: Option<&str>,
    ) -> Result<(Extension, UserQuota), AppError>;
}
