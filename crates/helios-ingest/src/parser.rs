//! CDR line parser
//!
//! One newline-terminated, comma-delimited line per call. The first three
//! fields (call time, callee, caller) are required; everything after them
//! is optional and defaults to empty. A leading `Call ` protocol tag is
//! stripped when present.
//!
//! Field layout:
//!
//! ```text
//! call_time, callee, caller, duration, time_answered, time_end,
//! reason_terminated, reason_changed, missed_queue_calls,
//! from_no, to_no, to_dn, final_number, final_dn,
//! from_type, to_type, final_type,
//! from_dispname, to_dispname, final_dispname
//! ```
//!
//! Only a missing/unparseable call time aborts the record. A malformed
//! duration degrades to `None` (the call still gets persisted, unrated),
//! and malformed answer/end times degrade the same way.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use helios_core::{
    models::{CallRecordDraft, RouteLeg, Routing},
    AppError, AppResult,
};
use tracing::warn;

/// Protocol tag some PBX firmwares prepend to the line
const LINE_PREFIX: &str = "Call ";

/// Parse one raw CDR line into an unrated draft
///
/// `fallback_date` supplies the date when the PBX sends a bare time of day
/// for the call-time field.
pub fn parse_line(line: &str, fallback_date: NaiveDate) -> AppResult<CallRecordDraft> {
    let line = line.trim();
    let line = line.strip_prefix(LINE_PREFIX).unwrap_or(line);

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(AppError::MalformedInput);
    }

    let field = |i: usize| -> &str { fields.get(i).copied().unwrap_or("") };

    let call_time = parse_datetime(field(0), fallback_date)?.ok_or_else(|| {
        AppError::InvalidTimestamp(format!(
            "Failed to parse datetime from string: {}",
            field(0)
        ))
    })?;

    let callee = field(1).to_string();
    let caller = match field(2) {
        "" => None,
        value => Some(value.to_string()),
    };

    let duration = parse_duration(field(3));
    let time_answered = parse_datetime(field(4), fallback_date).unwrap_or_else(|_| {
        warn!(value = field(4), "unparseable answer time, dropping");
        None
    });
    let time_end = parse_datetime(field(5), fallback_date).unwrap_or_else(|_| {
        warn!(value = field(5), "unparseable end time, dropping");
        None
    });

    Ok(CallRecordDraft {
        tenant_id: None,
        caller,
        external_number: callee.clone(),
        callee,
        call_time,
        duration,
        time_answered,
        time_end,
        reason_terminated: field(6).to_string(),
        reason_changed: field(7).to_string(),
        missed_queue_calls: field(8).to_string(),
        routing: Routing {
            from: RouteLeg {
                number: field(9).to_string(),
                dn: String::new(),
                leg_type: field(14).to_string(),
                display_name: field(17).to_string(),
            },
            to: RouteLeg {
                number: field(10).to_string(),
                dn: field(11).to_string(),
                leg_type: field(15).to_string(),
                display_name: field(18).to_string(),
            },
            final_leg: RouteLeg {
                number: field(12).to_string(),
                dn: field(13).to_string(),
                leg_type: field(16).to_string(),
                display_name: field(19).to_string(),
            },
        },
        ..CallRecordDraft::default()
    })
}

/// Parse a timestamp field, `/`-separated dates normalized to `-`
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (with optional fractional seconds) or a
/// bare `HH:MM:SS` combined with `fallback_date`. Empty input is `None`;
/// anything else unparseable is an error the caller decides how to handle.
fn parse_datetime(
    raw: &str,
    fallback_date: NaiveDate,
) -> AppResult<Option<chrono::DateTime<Utc>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let normalized = raw.replace('/', "-");

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(Some(dt.and_utc()));
        }
    }

    if let Ok(time) = NaiveTime::parse_from_str(&normalized, "%H:%M:%S") {
        return Ok(Some(fallback_date.and_time(time).and_utc()));
    }

    Err(AppError::InvalidTimestamp(format!(
        "Failed to parse datetime from string: {}",
        raw
    )))
}

/// Parse a `H:MM:SS` duration into total seconds
///
/// Any malformation yields `None` rather than failing the record.
fn parse_duration(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        warn!(value = raw, "malformed duration, treating as no duration");
        return None;
    }

    let mut total = 0i64;
    for part in &parts {
        match part.parse::<i64>() {
            Ok(n) if n >= 0 => total = total * 60 + n,
            _ => {
                warn!(value = raw, "malformed duration, treating as no duration");
                return None;
            }
        }
    }
    Some(total)
}
