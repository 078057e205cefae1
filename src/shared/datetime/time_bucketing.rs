use super::time::TimeConfig;
use crate::shared::time::TimeValue;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Calendar interval used for cohort and retention bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Week,
    Month,
}

/// Calendar-aware date bucketing
#[derive(Debug, Clone)]
pub struct CalendarTimeBucketer {
    config: TimeConfig,
    tz: Option<Tz>,
}

impl CalendarTimeBucketer {
    pub fn new(config: TimeConfig) -> Self {
        let tz = config.zone();
        Self { config, tz }
    }

    /// Local calendar date of an epoch-seconds instant
    pub fn local_date(&self, ts: i64) -> Option<NaiveDate> {
        let dt = DateTime::from_timestamp(ts, 0)?;
        Some(match self.tz {
            Some(tz) => dt.with_timezone(&tz).date_naive(),
            None => dt.date_naive(),
        })
    }

    /// Start date of the interval that contains `ts`
    pub fn bucket_date(&self, ts: i64, gran: TimeGranularity) -> Option<NaiveDate> {
        self.local_date(ts).map(|d| self.truncate(d, gran))
    }

    /// Calendar dates are truncated as written; instants are first read in
    /// the configured zone.
    pub fn bucket_time(&self, time: TimeValue, gran: TimeGranularity) -> Option<NaiveDate> {
        match time {
            TimeValue::Date(date) => Some(self.truncate(date, gran)),
            TimeValue::Instant(ts) => self.bucket_date(ts, gran),
        }
    }

    pub fn truncate(&self, date: NaiveDate, gran: TimeGranularity) -> NaiveDate {
        match gran {
            TimeGranularity::Week => self.bucket_week(date),
            TimeGranularity::Month => bucket_month(date),
        }
    }

    fn bucket_week(&self, date: NaiveDate) -> NaiveDate {
        let days_since_week_start = (date.weekday().num_days_from_monday()
            + (7 - self.config.week_start.num_days_from_monday()))
            % 7;
        date - Duration::days(days_since_week_start as i64)
    }
}

fn bucket_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Start of the interval `offset` steps after `start`
pub fn shift_interval(start: NaiveDate, gran: TimeGranularity, offset: u32) -> Option<NaiveDate> {
    match gran {
        TimeGranularity::Week => start.checked_add_signed(Duration::weeks(offset as i64)),
        TimeGranularity::Month => start.checked_add_months(Months::new(offset)),
    }
}

/// Number of whole intervals between two interval starts; None when `to` precedes `from`
pub fn interval_offset(from: NaiveDate, to: NaiveDate, gran: TimeGranularity) -> Option<u32> {
    if to < from {
        return None;
    }
    let steps = match gran {
        TimeGranularity::Week => (to - from).num_days() / 7,
        TimeGranularity::Month => {
            (to.year() as i64 * 12 + to.month0() as i64)
                - (from.year() as i64 * 12 + from.month0() as i64)
        }
    };
    u32::try_from(steps).ok()
}
