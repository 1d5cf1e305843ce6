//! Call record model
//!
//! One completed or attempted call as reported by the PBX. The rated fields
//! (`country`, `call_category`, `call_rate`, `total_cost`) are derived
//! exactly once when the record is created; they are never trusted as input.
//! Later recomputation only happens through the explicit re-rate job, which
//! also settles the quota ledger by the cost delta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pattern::CallCategory;

/// One leg of the routing a call took through the PBX
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLeg {
    /// Number on this leg
    pub number: String,

    /// Dialed name (DN) on this leg, when the PBX reports one
    pub dn: String,

    /// Leg type as reported by the PBX, e.g. "Extension", "Line"
    pub leg_type: String,

    /// Display name on this leg
    pub display_name: String,
}

/// The from/to/final routing triple of a call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    pub from: RouteLeg,
    pub to: RouteLeg,
    pub final_leg: RouteLeg,
}

/// Unrated call record as produced by the line parser
///
/// Everything the PBX reported, before classification and rating. The
/// ingestion pipeline fills in the derived fields and hands the result to
/// the repository as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallRecordDraft {
    /// Owning tenant (None falls back to the configured default tenant)
    pub tenant_id: Option<i64>,

    /// Calling extension (None when the PBX omitted it)
    pub caller: Option<String>,

    /// Dialed number
    pub callee: String,

    /// Call start time
    pub call_time: DateTime<Utc>,

    /// External/dialed number as seen by the trunk
    pub external_number: String,

    /// Duration in seconds; None means unanswered/no duration
    pub duration: Option<i64>,

    /// When the call was answered
    pub time_answered: Option<DateTime<Utc>>,

    /// When the call ended
    pub time_end: Option<DateTime<Utc>>,

    /// PBX termination reason code
    pub reason_terminated: String,

    /// PBX change reason code
    pub reason_changed: String,

    /// Missed-queue marker
    pub missed_queue_calls: String,

    /// Routing legs
    pub routing: Routing,

    /// Resolved country/category label (derived)
    pub country: String,

    /// Assigned call category (derived)
    pub call_category: CallCategory,

    /// Assigned rate per minute (derived)
    pub call_rate: Decimal,

    /// Computed total cost (derived; never caller-supplied)
    pub total_cost: Decimal,

    /// Set when the quota deduction for this call was rejected
    pub quota_exceeded: bool,
}

/// Persisted call record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique identifier
    pub id: i64,

    pub tenant_id: Option<i64>,
    pub caller: Option<String>,
    pub callee: String,
    pub call_time: DateTime<Utc>,
    pub external_number: String,
    pub duration: Option<i64>,
    pub time_answered: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub reason_terminated: String,
    pub reason_changed: String,
    pub missed_queue_calls: String,
    pub routing: Routing,
    pub country: String,
    pub call_category: CallCategory,
    pub call_rate: Decimal,
    pub total_cost: Decimal,
    pub quota_exceeded: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CallRecord {
    /// Check if the call was answered
    #[inline]
    pub fn was_answered(&self) -> bool {
        self.time_answered.is_some() && self.duration.unwrap_or(0) > 0
    }

    /// Duration formatted for display
    pub fn effective_duration(&self) -> String {
        let secs = self.duration.unwrap_or(0);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} at {}",
            self.caller.as_deref().unwrap_or("?"),
            self.callee,
            self.call_time
        )
    }
}
