//! Quota models
//!
//! A `Quota` is a named monthly spending allowance owned by a tenant and
//! reusable across extensions. A `UserQuota` is the live ledger row for one
//! extension: its remaining balance, the allowance it resets to, and when it
//! last reset. Balances reset on calendar-month boundaries.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named spending allowance, tenant-scoped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    /// Unique identifier
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Allowance name, e.g. "Standard 100"
    pub name: String,

    /// Full allowance amount granted each period
    pub amount: Decimal,
}

/// Live quota ledger for one extension
///
/// One-to-one with an extension. `remaining_balance` never goes negative as
/// the result of a deduction: an overdraft attempt is rejected and the call
/// record is flagged instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuota {
    /// Unique identifier
    pub id: i64,

    /// The extension this ledger belongs to
    pub extension_id: i64,

    /// Linked allowance (None means the balance never refills)
    pub quota_id: Option<i64>,

    /// Full allowance amount of the linked quota, denormalized for resets
    pub quota_amount: Option<Decimal>,

    /// Current remaining balance
    pub remaining_balance: Decimal,

    /// When the balance last reset to the full allowance
    pub last_reset: DateTime<Utc>,
}

impl UserQuota {
    /// Whether the calendar month/year has advanced past `last_reset`
    ///
    /// Idempotent within a month: once reset, the same month never
    /// triggers again.
    pub fn should_reset(&self, now: DateTime<Utc>) -> bool {
        now.year() > self.last_reset.year()
            || (now.year() == self.last_reset.year() && now.month() > self.last_reset.month())
    }

    /// Whether a deduction of `amount` would be accepted
    #[inline]
    pub fn can_deduct(&self, amount: Decimal) -> bool {
        self.remaining_balance >= amount
    }
}
