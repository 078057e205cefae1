use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// A time attribute as written: a calendar date carries no zone and is taken
/// as-is, an instant is placed on the calendar of the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    Date(NaiveDate),
    Instant(i64),
}

/// Reads time-like attribute values (cohort dates, signup stamps) as UTC
/// epoch seconds.
pub struct TimeParser;

impl TimeParser {
    /// RFC 3339 instants, bare dates (`2024-01-05`, `2024/01/05`) read as
    /// midnight UTC, and integer strings of any epoch unit.
    pub fn parse_str_to_epoch_seconds(input: &str) -> Option<i64> {
        match Self::parse_str(input)? {
            TimeValue::Instant(secs) => Some(secs),
            TimeValue::Date(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp()),
        }
    }

    pub fn parse_str(input: &str) -> Option<TimeValue> {
        let s = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(TimeValue::Instant(dt.timestamp()));
        }
        if let Some(date) = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        {
            return Some(TimeValue::Date(date));
        }
        s.parse::<i128>()
            .ok()
            .and_then(epoch_from_integer)
            .map(TimeValue::Instant)
    }

    /// Bare date strings stay calendar dates; RFC 3339 strings and numbers
    /// are instants.
    pub fn value_to_time(value: &Value) -> Option<TimeValue> {
        match value {
            Value::String(s) => Self::parse_str(s),
            other => Self::value_to_epoch_seconds(other).map(TimeValue::Instant),
        }
    }

    pub fn value_to_epoch_seconds(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => epoch_from_integer(i as i128),
                (None, Some(u)) => epoch_from_integer(u as i128),
                _ => n.as_f64().map(|f| f.floor() as i64),
            },
            Value::String(s) => Self::parse_str_to_epoch_seconds(s),
            _ => None,
        }
    }

    pub fn value_to_datetime(value: &Value) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(Self::value_to_epoch_seconds(value)?, 0)
    }
}

/// Infers the unit from the digit count: seconds up to 11 digits, then
/// milliseconds, microseconds and nanoseconds.
fn epoch_from_integer(n: i128) -> Option<i64> {
    let digits = n.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1);
    let divisor: i128 = match digits {
        0..=11 => 1,
        12..=14 => 1_000,
        15..=16 => 1_000_000,
        17..=19 => 1_000_000_000,
        _ => return None,
    };
    i64::try_from(n / divisor).ok()
}
