//! Argument validation: time zones, instants, addresses, limits.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::common::ToolError;

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const MAX_RESULTS_LIMIT: usize = 250;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// IANA zone identifier, e.g. `Asia/Kolkata`.
pub fn parse_timezone(name: &str) -> Result<Tz, ToolError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ToolError::invalid(format!("'{}' is not an IANA time zone", name)))
}

/// Resolve a date/time argument to a single instant.
///
/// RFC 3339 input with an offset stands on its own. A naive date-time (or a
/// bare date, meaning midnight) is read as wall-clock time in `tz` and must
/// map to exactly one instant there.
pub fn resolve_instant(
    field: &str,
    value: &str,
    tz: Option<Tz>,
) -> Result<DateTime<Utc>, ToolError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = parse_naive(value).ok_or_else(|| {
        ToolError::invalid(format!(
            "'{}' value '{}' is not a date/time (expected e.g. 2024-06-10T14:00 or RFC 3339)",
            field, value
        ))
    })?;

    let tz = tz.ok_or_else(|| {
        ToolError::invalid(format!(
            "'{}' value '{}' has no UTC offset; a timezone is required",
            field, value
        ))
    })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, later) => Err(ToolError::invalid(format!(
            "'{}' value '{}' is ambiguous in {} ({} or {})",
            field,
            value,
            tz.name(),
            earlier.to_rfc3339(),
            later.to_rfc3339()
        ))),
        LocalResult::None => Err(ToolError::invalid(format!(
            "'{}' value '{}' does not exist in {} (skipped by a DST transition)",
            field,
            value,
            tz.name()
        ))),
    }
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ToolError> {
    if end <= start {
        return Err(ToolError::invalid(format!(
            "end ({}) must be after start ({})",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    Ok(())
}

/// Minimal address sanity check; the mail server has the final word.
pub fn validate_email(address: &str) -> Result<String, ToolError> {
    let address = address.trim();
    let valid = !address.is_empty()
        && address.contains('@')
        && !address.starts_with('@')
        && !address.ends_with('@')
        && !address.chars().any(|c| c.is_whitespace() || c.is_control());
    if valid {
        Ok(address.to_string())
    } else {
        Err(ToolError::invalid(format!("'{}' is not a valid email address", address)))
    }
}

pub fn validate_emails(field: &str, addresses: Vec<String>) -> Result<Vec<String>, ToolError> {
    addresses
        .iter()
        .map(|a| validate_email(a).map_err(|e| ToolError::invalid(format!("{}: {}", field, e))))
        .collect()
}

/// Header injection guard.
pub fn validate_subject(subject: &str) -> Result<(), ToolError> {
    if subject.contains('\r') || subject.contains('\n') {
        return Err(ToolError::invalid("subject must not contain line breaks"));
    }
    Ok(())
}

pub fn max_results(requested: Option<u64>) -> Result<usize, ToolError> {
    match requested {
        None => Ok(DEFAULT_MAX_RESULTS),
        Some(n) if (1..=MAX_RESULTS_LIMIT as u64).contains(&n) => Ok(n as usize),
        Some(n) => Err(ToolError::invalid(format!(
            "maxResults must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, n
        ))),
    }
}
