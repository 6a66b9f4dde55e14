//! Time-range filter presets ("1D", "1W", "1M", "3M", "1Y").
//!
//! Presets are static configuration. Lookup by name never fails: an unknown
//! name resolves to [`DEFAULT_FILTER`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dates::{shift_back, DateRange};

/// Candle sampling resolution, as the provider spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1")]
    OneMinute,
    #[serde(rename = "5")]
    FiveMinutes,
    #[serde(rename = "15")]
    FifteenMinutes,
    #[serde(rename = "30")]
    ThirtyMinutes,
    #[serde(rename = "60")]
    Hourly,
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "M")]
    Monthly,
}

impl Resolution {
    pub const ALL: [Resolution; 8] = [
        Resolution::OneMinute,
        Resolution::FiveMinutes,
        Resolution::FifteenMinutes,
        Resolution::ThirtyMinutes,
        Resolution::Hourly,
        Resolution::Daily,
        Resolution::Weekly,
        Resolution::Monthly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::OneMinute => "1",
            Resolution::FiveMinutes => "5",
            Resolution::FifteenMinutes => "15",
            Resolution::ThirtyMinutes => "30",
            Resolution::Hourly => "60",
            Resolution::Daily => "D",
            Resolution::Weekly => "W",
            Resolution::Monthly => "M",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resolution '{s}'"))
    }
}

/// A named chart window: how far back from "now", and at which resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub name: &'static str,
    pub days: u32,
    pub weeks: u32,
    pub months: u32,
    pub years: u32,
    pub resolution: Resolution,
}

/// Preset used when a filter name is not recognized.
pub const DEFAULT_FILTER: &str = "1M";

/// Preset a freshly created pipeline starts on.
pub const INITIAL_FILTER: &str = "1W";

/// All presets, in display order.
pub static FILTERS: [FilterSpec; 5] = [
    FilterSpec {
        name: "1D",
        days: 1,
        weeks: 0,
        months: 0,
        years: 0,
        resolution: Resolution::OneMinute,
    },
    FilterSpec {
        name: "1W",
        days: 0,
        weeks: 1,
        months: 0,
        years: 0,
        resolution: Resolution::FifteenMinutes,
    },
    FilterSpec {
        name: "1M",
        days: 0,
        weeks: 0,
        months: 1,
        years: 0,
        resolution: Resolution::Hourly,
    },
    FilterSpec {
        name: "3M",
        days: 0,
        weeks: 0,
        months: 3,
        years: 0,
        resolution: Resolution::Daily,
    },
    FilterSpec {
        name: "1Y",
        days: 0,
        weeks: 0,
        months: 0,
        years: 1,
        resolution: Resolution::Daily,
    },
];

impl FilterSpec {
    /// Exact-name lookup.
    pub fn find(name: &str) -> Option<&'static FilterSpec> {
        FILTERS.iter().find(|f| f.name == name)
    }

    /// Lookup that falls back to the default preset.
    pub fn lookup(name: &str) -> &'static FilterSpec {
        Self::find(name).unwrap_or_else(Self::default_preset)
    }

    pub fn default_preset() -> &'static FilterSpec {
        // FILTERS[2] is DEFAULT_FILTER; the unit tests pin this.
        &FILTERS[2]
    }

    /// Preset names in display order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        FILTERS.iter().map(|f| f.name)
    }

    /// The window ending at `now`.
    pub fn date_range(&self, now: DateTime<Utc>) -> DateRange {
        let start = shift_back(now, self.days, self.weeks, self.months, self.years);
        DateRange {
            start: start.timestamp(),
            end: now.timestamp(),
        }
    }

    /// Human-readable offset, e.g. "1 week" or "3 months".
    pub fn describe_offset(&self) -> String {
        let parts: Vec<String> = [
            (self.years, "year"),
            (self.months, "month"),
            (self.weeks, "week"),
            (self.days, "day"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| {
            if *n == 1 {
                format!("1 {unit}")
            } else {
                format!("{n} {unit}s")
            }
        })
        .collect();
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(" ")
        }
    }
}
