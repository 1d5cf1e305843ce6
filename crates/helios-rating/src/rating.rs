//! Cost calculation
//!
//! Duration rounds up to whole billable minutes with a floor of one minute
//! for any strictly positive duration. All arithmetic is fixed-point
//! `Decimal`; binary floats never touch the money path. Both functions are
//! pure and idempotent, which the re-rate job relies on when it reconciles
//! an old cost against a new one.

use rust_decimal::Decimal;

/// Billable minutes for a duration in seconds
///
/// `ceil(duration / 60)`; None, zero, and negative durations bill nothing.
#[inline]
pub fn billable_minutes(duration: Option<i64>) -> i64 {
    match duration {
        Some(secs) if secs > 0 => (secs + 59) / 60,
        _ => 0,
    }
}

/// Total cost of a call: billable minutes times the per-minute rate
#[inline]
pub fn calculate_cost(duration: Option<i64>, rate_per_min: Decimal) -> Decimal {
    Decimal::from(billable_minutes(duration)) * rate_per_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_billable_minutes_rounding() {
        assert_eq!(billable_minutes(Some(1)), 1);
        assert_eq!(billable_minutes(Some(59)), 1);
        assert_eq!(billable_minutes(Some(60)), 1);
        assert_eq!(billable_minutes(Some(61)), 2);
        assert_eq!(billable_minutes(Some(120)), 2);
        assert_eq!(billable_minutes(Some(150)), 3);
    }

    #[test]
    fn test_billable_minutes_empty() {
        assert_eq!(billable_minutes(None), 0);
        assert_eq!(billable_minutes(Some(0)), 0);
        assert_eq!(billable_minutes(Some(-5)), 0);
    }

    #[test]
    fn test_cost_exact_fixed_point() {
        // 90s -> 2 minutes at 0.50 -> exactly 1.00
        assert_eq!(calculate_cost(Some(90), dec!(0.50)), dec!(1.00));
        assert_eq!(calculate_cost(Some(150), dec!(2.00)), dec!(6.00));
        assert_eq!(calculate_cost(Some(60), dec!(0.10)), dec!(0.10));
    }

    #[test]
    fn test_cost_empty_duration() {
        assert_eq!(calculate_cost(None, dec!(2.00)), Decimal::ZERO);
        assert_eq!(calculate_cost(Some(0), dec!(2.00)), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_minutes_cover_duration(secs in 1i64..1_000_000) {
            let minutes = billable_minutes(Some(secs));
            // Enough minutes to cover the duration, but never a full
            // spare minute.
            prop_assert!(minutes * 60 >= secs);
            prop_assert!((minutes - 1) * 60 < secs);
        }

        #[test]
        fn prop_cost_idempotent(secs in proptest::option::of(0i64..1_000_000), cents in 0u32..10_000) {
            let rate = Decimal::new(cents as i64, 2);
            prop_assert_eq!(
                calculate_cost(secs, rate),
                calculate_cost(secs, rate)
            );
        }

        #[test]
        fn prop_cost_is_minutes_times_rate(secs in 0i64..1_000_000, cents in 0u32..10_000) {
            let rate = Decimal::new(cents as i64, 2);
            let expected = Decimal::from(billable_minutes(Some(secs))) * rate;
            prop_assert_eq!(calculate_cost(Some(secs), rate), expected);
        }
    }
}
