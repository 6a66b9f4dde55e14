//! Provider payloads (Finnhub REST API).
//!
//! Field names follow the provider's JSON; Rust names are spelled out and
//! mapped with `#[serde(rename)]`. Fields the provider omits for unknown
//! symbols are optional or defaulted so an empty `{}` still deserializes.

use serde::{Deserialize, Serialize};

/// Response of `GET /search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub result: Vec<SymbolMatch>,
}

/// One symbol-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "displaySymbol", default)]
    pub display_symbol: String,
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Response of `GET /stock/profile2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub country: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub finnhub_industry: Option<String>,
    pub ipo: Option<String>,
    pub logo: Option<String>,
    /// Market capitalization in millions of `currency`.
    pub market_capitalization: Option<f64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Shares outstanding, in millions.
    pub share_outstanding: Option<f64>,
    pub ticker: Option<String>,
    pub weburl: Option<String>,
}

impl CompanyProfile {
    /// Market capitalization converted from millions to billions.
    pub fn market_cap_billions(&self) -> Option<f64> {
        self.market_capitalization.map(|m| m / 1000.0)
    }

    /// The provider answers `{}` for symbols it does not know.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.ticker.is_none()
    }
}

/// Response of `GET /quote`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "c", default)]
    pub current: f64,
    #[serde(rename = "d", default)]
    pub change: Option<f64>,
    #[serde(rename = "dp", default)]
    pub percent_change: Option<f64>,
    #[serde(rename = "h", default)]
    pub high: f64,
    #[serde(rename = "l", default)]
    pub low: f64,
    #[serde(rename = "o", default)]
    pub open: f64,
    #[serde(rename = "pc", default)]
    pub previous_close: f64,
    #[serde(rename = "t", default)]
    pub timestamp: i64,
}

/// Response of `GET /stock/candle`: parallel arrays indexed by sample.
///
/// Every array is optional so a `no_data` answer (which carries only `s`)
/// still deserializes; the chart mapper decides whether the shape is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(rename = "s", default)]
    pub status: Option<String>,
    #[serde(rename = "c", default)]
    pub close: Option<Vec<f64>>,
    #[serde(rename = "t", default)]
    pub timestamps: Option<Vec<i64>>,
    #[serde(rename = "o", default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Vec<f64>>,
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Vec<f64>>,
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Vec<f64>>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Vec<f64>>,
}

impl RawSeries {
    pub const STATUS_OK: &'static str = "ok";

    /// Whether the provider flagged this series as a successful answer.
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some(Self::STATUS_OK)
    }

    /// Number of close samples, zero when the array is missing.
    pub fn len(&self) -> usize {
        self.close.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
