//! Time handling utilities for forecast samples.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Nanoseconds in one hour, the unit lead times are stored in.
pub const NANOS_PER_HOUR: i64 = 3_600 * 1_000_000_000;

/// Lead time in nanoseconds for a forecast hour.
pub fn lead_time_ns(fhr: u32) -> i64 {
    i64::from(fhr) * NANOS_PER_HOUR
}

/// Integer forecast hour for a lead time in nanoseconds.
///
/// Truncates toward zero, so a 90 minute lead time maps to hour 1.
pub fn fhr_from_lead_time_ns(lead_time: i64) -> i64 {
    lead_time / NANOS_PER_HOUR
}

/// Valid time of a forecast: initialization time plus lead time.
pub fn valid_time(t0: DateTime<Utc>, lead_time: i64) -> DateTime<Utc> {
    t0 + Duration::nanoseconds(lead_time)
}

/// Parse a timestamp as written in configuration files.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH` and plain dates,
/// all interpreted as UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{s}:00:00"), "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Some(ndt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Nanoseconds since the Unix epoch, the encoding used for datetime arrays.
pub fn to_epoch_ns(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_nanos_opt().unwrap_or(i64::MIN)
}

/// Inverse of [`to_epoch_ns`].
pub fn from_epoch_ns(ns: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_nanos(ns)
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
