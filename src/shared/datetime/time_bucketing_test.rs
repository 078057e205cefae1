use crate::shared::datetime::time::TimeConfig;
use crate::shared::datetime::time_bucketing::{
    CalendarTimeBucketer, TimeGranularity, interval_offset, shift_interval,
};
use crate::shared::time::TimeValue;
use chrono::{NaiveDate, Weekday};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn month_bucket_truncates_to_first_of_month() {
    let bucketer = CalendarTimeBucketer::new(TimeConfig::default());
    // 2024-02-15 00:00:00 UTC
    let got = bucketer.bucket_date(1708012800, TimeGranularity::Month);
    assert_eq!(got, Some(date(2024, 2, 1)));
}

#[test]
fn week_bucket_defaults_to_sunday_start() {
    let bucketer = CalendarTimeBucketer::new(TimeConfig::default());
    // Wednesday 2024-01-03 and Saturday 2024-01-06, three days apart
    let wed = bucketer.bucket_date(1704240000, TimeGranularity::Week);
    let sat = bucketer.bucket_date(1704499200, TimeGranularity::Week);
    assert_eq!(wed, Some(date(2023, 12, 31)));
    assert_eq!(wed, sat);
}

#[test]
fn week_bucket_splits_across_week_boundary() {
    let bucketer = CalendarTimeBucketer::new(TimeConfig::default());
    // Saturday 2024-01-06 and Sunday 2024-01-07
    let sat = bucketer.bucket_date(1704499200, TimeGranularity::Week);
    let sun = bucketer.bucket_date(1704585600, TimeGranularity::Week);
    assert_ne!(sat, sun);
    assert_eq!(sun, Some(date(2024, 1, 7)));
}

#[test]
fn week_bucket_honors_configured_week_start() {
    let bucketer = CalendarTimeBucketer::new(TimeConfig {
        timezone: None,
        week_start: Weekday::Mon,
    });
    let got = bucketer.bucket_date(1704240000, TimeGranularity::Week);
    assert_eq!(got, Some(date(2024, 1, 1)));
}

#[test]
fn timezone_shifts_local_date_before_truncation() {
    let utc = CalendarTimeBucketer::new(TimeConfig::default());
    let eastern = CalendarTimeBucketer::new(TimeConfig {
        timezone: Some("US/Eastern".to_string()),
        week_start: Weekday::Sun,
    });
    // 2024-02-01 03:00:00 UTC is still January 31st in New York
    let ts = 1706756400;
    assert_eq!(utc.bucket_date(ts, TimeGranularity::Month), Some(date(2024, 2, 1)));
    assert_eq!(
        eastern.bucket_date(ts, TimeGranularity::Month),
        Some(date(2024, 1, 1))
    );
}

#[test]
fn shift_and_offset_are_inverse() {
    let start = date(2023, 11, 1);
    let later = shift_interval(start, TimeGranularity::Month, 3).unwrap();
    assert_eq!(later, date(2024, 2, 1));
    assert_eq!(interval_offset(start, later, TimeGranularity::Month), Some(3));

    let week = date(2023, 12, 31);
    let next = shift_interval(week, TimeGranularity::Week, 2).unwrap();
    assert_eq!(next, date(2024, 1, 14));
    assert_eq!(interval_offset(week, next, TimeGranularity::Week), Some(2));
}

#[test]
fn offset_before_start_is_none() {
    assert_eq!(
        interval_offset(date(2024, 2, 1), date(2024, 1, 1), TimeGranularity::Month),
        None
    );
}

#[test]
fn calendar_dates_skip_the_zone_conversion() {
    let eastern = CalendarTimeBucketer::new(TimeConfig {
        timezone: Some("America/New_York".to_string()),
        week_start: Weekday::Sun,
    });
    let feb_first = TimeValue::Date(date(2024, 2, 1));
    assert_eq!(
        eastern.bucket_time(feb_first, TimeGranularity::Month),
        Some(date(2024, 2, 1))
    );
    assert_eq!(
        eastern.bucket_time(TimeValue::Date(date(2024, 2, 4)), TimeGranularity::Week),
        Some(date(2024, 2, 4))
    );
    assert_eq!(
        eastern.bucket_time(TimeValue::Instant(1706745600), TimeGranularity::Month),
        Some(date(2024, 1, 1))
    );
}
