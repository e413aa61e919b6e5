//! Day-granularity date handling.
//!
//! Users filter dates by calendar day while storage keeps full timestamps, so a
//! bare `YYYY-MM-DD` expands to the whole UTC day `[00:00:00.000, 23:59:59.999]`.
//! Any other accepted date string denotes one instant and is used unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::FilterError;

/// The inclusive instant range covered by a user-supplied date value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBounds {
    fn whole_day(d: NaiveDate) -> Self {
        let start = d.and_time(NaiveTime::MIN);
        // 23:59:59.999 is always representable
        let end = d.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN));
        Self {
            start: Utc.from_utc_datetime(&start),
            end: Utc.from_utc_datetime(&end),
        }
    }

    fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }
}

/// Parse a date filter operand.
pub fn parse_date_value(v: &Value) -> Result<DayBounds, FilterError> {
    match v {
        Value::String(s) => parse_date_str(s),
        other => Err(FilterError::type_mismatch("date string", other)),
    }
}

pub fn parse_date_str(raw: &str) -> Result<DayBounds, FilterError> {
    let s = raw.trim();
    if s.len() == 10 {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DayBounds::whole_day(d));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(DayBounds::instant(dt.with_timezone(&Utc)));
    }
    // Zone-less timestamps are read as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DayBounds::instant(Utc.from_utc_datetime(&naive)));
        }
    }
    Err(FilterError::InvalidDate(raw.to_string()))
}

/// Lower edge of the day (or the instant itself).
pub fn start_of(v: &Value) -> Result<DateTime<Utc>, FilterError> {
    parse_date_value(v).map(|b| b.start)
}

/// Upper edge of the day (or the instant itself).
pub fn end_of(v: &Value) -> Result<DateTime<Utc>, FilterError> {
    parse_date_value(v).map(|b| b.end)
}
