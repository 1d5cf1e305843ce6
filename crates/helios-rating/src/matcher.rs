//! Tenant pattern matching
//!
//! Scans one tenant's ordered pattern list and returns the first pattern
//! accepting the dialed number. Ordering is owned by the operator: the
//! matcher never re-sorts, so overlapping patterns resolve to whichever is
//! stored first. With no match, the tenant's designated `unknown` pattern
//! supplies the rate; with none of those either, the call is Unknown at
//! rate zero.

use helios_core::models::{CallCategory, CallPattern};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Outcome of matching a number against a tenant's pattern list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Assigned category
    pub category: CallCategory,

    /// Rate per minute
    pub rate: Decimal,

    /// The pattern that matched (None for the zero-rate fallback)
    pub pattern_id: Option<i64>,
}

impl PatternMatch {
    /// The zero-rate fallback when nothing matched
    pub fn unknown() -> Self {
        Self {
            category: CallCategory::Unknown,
            rate: Decimal::ZERO,
            pattern_id: None,
        }
    }
}

/// Match a dialed number against a tenant's patterns, first match wins
pub fn match_number(patterns: &[CallPattern], number: &str) -> PatternMatch {
    for pattern in patterns {
        if pattern.matches(number) {
            debug!(
                number,
                pattern = %pattern.pattern,
                category = %pattern.call_type,
                "pattern matched"
            );
            return PatternMatch {
                category: pattern.call_type,
                rate: pattern.rate_per_min,
                pattern_id: Some(pattern.id),
            };
        }
    }

    // No pattern matched: fall back to the tenant's unknown-category
    // pattern if it defines one.
    if let Some(fallback) = patterns
        .iter()
        .find(|p| p.call_type == CallCategory::Unknown)
    {
        warn!(number, "no pattern matched, using unknown-category fallback");
        return PatternMatch {
            category: CallCategory::Unknown,
            rate: fallback.rate_per_min,
            pattern_id: Some(fallback.id),
        };
    }

    warn!(number, "no pattern matched and no fallback defined");
    PatternMatch::unknown()
}
