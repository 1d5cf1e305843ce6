//! Quota ledger
//!
//! Owns the mutation path for per-extension balances. The read-check-write
//! of a deduction is one atomic unit: a per-extension async mutex serializes
//! concurrent handlers for the same extension, and the repository's
//! `try_deduct` is itself balance-guarded so the balance can never be driven
//! negative. Unrelated extensions never contend on a shared lock.
//!
//! The monthly reset is lazy: it is checked under the same guard immediately
//! before every deduction, so a deduction never applies against a stale
//! pre-reset balance.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use helios_core::{traits::QuotaRepository, AppResult};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Result of a ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// The delta was applied in full
    Applied,

    /// Deduction rejected: it would have overdrawn the balance
    Rejected { available: Decimal },

    /// The extension has no quota ledger; nothing was applied
    NoQuota,
}

impl LedgerOutcome {
    /// Whether the operation mutated the balance
    pub fn applied(&self) -> bool {
        matches!(self, LedgerOutcome::Applied)
    }
}

/// Per-extension quota ledger over an abstract quota repository
pub struct QuotaLedger<Q: QuotaRepository> {
    quota_repo: Arc<Q>,
    guards: DashMap<(i64, String), Arc<Mutex<()>>>,
}

impl<Q: QuotaRepository> QuotaLedger<Q> {
    /// Create a new ledger
    pub fn new(quota_repo: Arc<Q>) -> Self {
        Self {
            quota_repo,
            guards: DashMap::new(),
        }
    }

    /// The serialization guard for one extension
    fn guard(&self, tenant_id: i64, extension: &str) -> Arc<Mutex<()>> {
        self.guards
            .entry((tenant_id, extension.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Deduct `amount` from an extension's balance
    ///
    /// Runs the lazy monthly reset first, then attempts the balance-guarded
    /// deduction. A rejected deduction mutates nothing.
    #[instrument(skip(self))]
    pub async fn deduct(
        &self,
        tenant_id: i64,
        extension: &str,
        amount: Decimal,
    ) -> AppResult<LedgerOutcome> {
        self.deduct_at(tenant_id, extension, amount, Utc::now()).await
    }

    /// Deduction with an explicit clock, for reset-boundary tests
    pub async fn deduct_at(
        &self,
        tenant_id: i64,
        extension: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerOutcome> {
        if amount <= Decimal::ZERO {
            return Ok(LedgerOutcome::Applied);
        }

        let guard = self.guard(tenant_id, extension);
        let _held = guard.lock().await;

        let Some(quota) = self
            .quota_repo
            .get_for_extension(tenant_id, extension)
            .await?
        else {
            warn!(extension, "no quota set for extension, skipping deduction");
            return Ok(LedgerOutcome::NoQuota);
        };

        let quota = self.reset_if_due(quota, now).await?;

        if self.quota_repo.try_deduct(quota.id, amount).await? {
            debug!(extension, %amount, "quota deduction applied");
            Ok(LedgerOutcome::Applied)
        } else {
            warn!(
                extension,
                required = %amount,
                available = %quota.remaining_balance,
                "quota exceeded, deduction rejected"
            );
            Ok(LedgerOutcome::Rejected {
                available: quota.remaining_balance,
            })
        }
    }

    /// Add `amount` to an extension's balance (manual credit or reversal)
    #[instrument(skip(self))]
    pub async fn credit(
        &self,
        tenant_id: i64,
        extension: &str,
        amount: Decimal,
    ) -> AppResult<LedgerOutcome> {
        if amount <= Decimal::ZERO {
            return Ok(LedgerOutcome::Applied);
        }

        let guard = self.guard(tenant_id, extension);
        let _held = guard.lock().await;

        let Some(quota) = self
            .quota_repo
            .get_for_extension(tenant_id, extension)
            .await?
        else {
            warn!(extension, "no quota set for extension, skipping credit");
            return Ok(LedgerOutcome::NoQuota);
        };

        let new_balance = self.quota_repo.credit(quota.id, amount).await?;
        debug!(extension, %amount, %new_balance, "quota credit applied");
        Ok(LedgerOutcome::Applied)
    }

    /// Run the monthly reset check for an extension on its own
    ///
    /// Deductions already do this internally; this entry point backs an
    /// explicit scheduled reset sweep.
    #[instrument(skip(self))]
    pub async fn check_and_reset_if_needed(
        &self,
        tenant_id: i64,
        extension: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let guard = self.guard(tenant_id, extension);
        let _held = guard.lock().await;

        let Some(quota) = self
            .quota_repo
            .get_for_extension(tenant_id, extension)
            .await?
        else {
            return Ok(false);
        };

        let was_due = quota.should_reset(now) && quota.quota_amount.is_some();
        self.reset_if_due(quota, now).await?;
        Ok(was_due)
    }

    /// Adjust the balance by a recomputed cost delta
    ///
    /// Applies `new_cost - old_cost`, never the full new cost, so a
    /// re-rated record is charged exactly once.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        tenant_id: i64,
        extension: &str,
        old_cost: Decimal,
        new_cost: Decimal,
    ) -> AppResult<LedgerOutcome> {
        let delta = new_cost - old_cost;
        if delta > Decimal::ZERO {
            self.deduct(tenant_id, extension, delta).await
        } else if delta < Decimal::ZERO {
            self.credit(tenant_id, extension, -delta).await
        } else {
            Ok(LedgerOutcome::Applied)
        }
    }

    /// Reset the balance to the full allowance when the period rolled over
    async fn reset_if_due(
        &self,
        quota: helios_core::models::UserQuota,
        now: DateTime<Utc>,
    ) -> AppResult<helios_core::models::UserQuota> {
        if !quota.should_reset(now) {
            return Ok(quota);
        }
        let Some(amount) = quota.quota_amount else {
            // No linked allowance: the balance carries over unrefilled.
            return Ok(quota);
        };

        info!(
            user_quota_id = quota.id,
            old_balance = %quota.remaining_balance,
            new_balance = %amount,
            "monthly quota reset"
        );
        self.quota_repo.reset_balance(quota.id, amount, now).await?;

        let mut refreshed = quota;
        refreshed.remaining_balance = amount;
        refreshed.last_reset = now;
        Ok(refreshed)
    }
}
