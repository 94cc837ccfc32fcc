//! Timestamp parsing and Japan Standard Time calendar helpers
//!
//! All calendar boundaries (today, yesterday, month) are computed in
//! `Asia/Tokyo`, which has no daylight-saving transitions, so every local
//! midnight maps to exactly one instant.

use crate::error::{MeterError, Result};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};
use chrono_tz::Tz;

/// Calendar zone for every dashboard boundary
pub const JST: Tz = chrono_tz::Asia::Tokyo;

/// Parse an API timestamp.
///
/// Accepts a trailing `Z`, an explicit offset, or no offset at all (taken as UTC).
pub fn parse_api_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| MeterError::protocol(format!("Invalid timestamp '{raw}': {e}")))
}

/// Render an instant as JST ISO-8601, e.g. `2024-01-01T00:30:00+09:00`
pub fn to_jst_iso(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&JST)
        .to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Render an instant as UTC ISO-8601 for query variables
pub fn to_utc_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Midnight of `date` in JST, as a UTC instant
pub fn midnight_jst(date: NaiveDate) -> Result<DateTime<Utc>> {
    JST.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| MeterError::protocol(format!("Ambiguous JST midnight for {date}")))
}

fn first_day_of_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .ok_or_else(|| MeterError::protocol(format!("No first day for month of {date}")))
}

fn first_day_of_prev_month(date: NaiveDate) -> Result<NaiveDate> {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| MeterError::protocol(format!("No previous month for {date}")))
}

/// Calendar boundaries derived from one "now" in JST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JstBoundaries {
    pub today_midnight: DateTime<Utc>,
    pub yesterday_midnight: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    pub prev_month_start: DateTime<Utc>,
    pub prev_month_end: DateTime<Utc>,
    pub recent_start: DateTime<Utc>,
}

/// Width of the recent-readings window, in hours
pub const RECENT_WINDOW_HOURS: i64 = 12;

impl JstBoundaries {
    pub fn at(now: DateTime<Utc>) -> Result<Self> {
        let today = now.with_timezone(&JST).date_naive();
        let today_midnight = midnight_jst(today)?;
        let month_start = midnight_jst(first_day_of_month(today)?)?;
        let prev_month_start = midnight_jst(first_day_of_prev_month(today)?)?;

        Ok(Self {
            today_midnight,
            yesterday_midnight: today_midnight - Duration::hours(24),
            month_start,
            prev_month_start,
            prev_month_end: month_start,
            recent_start: now - Duration::hours(RECENT_WINDOW_HOURS),
        })
    }
}
