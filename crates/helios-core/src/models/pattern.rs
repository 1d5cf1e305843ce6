//! Call pattern model
//!
//! A pattern classifies a dialed number into a call category with a
//! per-minute rate. Patterns are tenant-scoped and may overlap; matching is
//! first-match-wins over the tenant-defined order, so operators are expected
//! to store the most specific pattern first. The matcher never re-sorts.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Closed set of call categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallCategory {
    Mobile,
    National,
    International,
    Local,
    Internal,
    #[default]
    Unknown,
}

impl CallCategory {
    /// Stable string form used in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            CallCategory::Mobile => "mobile",
            CallCategory::National => "national",
            CallCategory::International => "international",
            CallCategory::Local => "local",
            CallCategory::Internal => "internal",
            CallCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CallCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(CallCategory::Mobile),
            "national" => Ok(CallCategory::National),
            "international" => Ok(CallCategory::International),
            "local" => Ok(CallCategory::Local),
            "internal" => Ok(CallCategory::Internal),
            "unknown" => Ok(CallCategory::Unknown),
            _ => Err(()),
        }
    }
}

/// Call pattern entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPattern {
    /// Unique identifier
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Raw pattern string: a literal prefix, or the international
    /// markers `+` / `00`
    pub pattern: String,

    /// Category assigned to matching calls
    pub call_type: CallCategory,

    /// Rate per minute (2 decimal places)
    pub rate_per_min: Decimal,

    /// Optional operator note
    pub description: Option<String>,

    /// Position within the tenant's ordered pattern list
    pub position: i32,
}

impl CallPattern {
    /// Regex source for this pattern
    ///
    /// `+` matches any `+`-prefixed digit string, `00` any `00`-prefixed
    /// digit string; everything else is an escaped literal prefix anchored
    /// at the start and open at the end.
    pub fn regex_source(&self) -> String {
        match self.pattern.as_str() {
            "+" => r"^\+\d+".to_string(),
            "00" => r"^00\d+".to_string(),
            other => format!("^{}", regex::escape(other)),
        }
    }

    /// Whether this pattern accepts the given dialed number
    ///
    /// A pattern whose regex fails to build is skipped (returns false) so
    /// that one bad row never aborts the whole scan.
    pub fn matches(&self, number: &str) -> bool {
        match Regex::new(&self.regex_source()) {
            Ok(re) => re.is_match(number),
            Err(e) => {
                warn!(
                    pattern = %self.pattern,
                    tenant_id = self.tenant_id,
                    "skipping unbuildable call pattern: {}",
                    e
                );
                false
            }
        }
    }
}

impl fmt::Display for CallPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tenant {} - {} ({})",
            self.tenant_id, self.call_type, self.pattern
        )
    }
}
