pub mod time;
pub mod time_bucketing;

pub use time::TimeConfig;
pub use time_bucketing::{CalendarTimeBucketer, TimeGranularity};

#[cfg(test)]
mod time_bucketing_test;
