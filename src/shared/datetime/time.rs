use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Calendar rules for truncating dates into cohort intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// IANA zone name; dates are read in UTC when unset
    pub timezone: Option<String>,
    pub week_start: Weekday,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            week_start: Weekday::Sun,
        }
    }
}

impl TimeConfig {
    /// The configured zone. Unknown names fall back to UTC with a warning.
    pub fn zone(&self) -> Option<Tz> {
        let name = self.timezone.as_deref()?.trim();
        match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(target: "snel_cohort::time", timezone = %name, "Unknown timezone, using UTC");
                None
            }
        }
    }
}
