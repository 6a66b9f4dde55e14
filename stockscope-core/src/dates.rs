//! Date helpers: injectable clock, calendar offsets, epoch formatting.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Source of "now" for range computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Inclusive window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn span_seconds(&self) -> i64 {
        self.end - self.start
    }
}

/// Move `date` back by a calendar offset.
///
/// Days and weeks are subtracted first, then months and years together.
/// A day-of-month that does not exist in the target month clamps to the
/// month's last day.
pub fn shift_back(
    date: DateTime<Utc>,
    days: u32,
    weeks: u32,
    months: u32,
    years: u32,
) -> DateTime<Utc> {
    let total_days = i64::from(days) + 7 * i64::from(weeks);
    let total_months = months.saturating_add(years.saturating_mul(12));

    let shifted = date
        .checked_sub_signed(Duration::days(total_days))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    shifted
        .checked_sub_months(Months::new(total_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A validated strftime pattern for chart dates.
///
/// chrono panics when displaying an invalid pattern, so patterns are checked
/// once at construction and every formatting call afterwards is infallible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateFormat(String);

impl DateFormat {
    pub const DEFAULT: &'static str = "%-m/%-d/%Y";

    pub fn new(pattern: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(ConfigError::Invalid("date format is empty".into()));
        }
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "invalid date format '{pattern}'"
            )));
        }
        Ok(Self(pattern))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format an epoch-seconds timestamp in UTC. `None` if out of range.
    pub fn format_timestamp(&self, epoch_seconds: i64) -> Option<String> {
        DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.format(&self.0).to_string())
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DateFormat> for String {
    fn from(value: DateFormat) -> Self {
        value.0
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
