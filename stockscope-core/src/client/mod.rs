//! Market data client trait.
//!
//! The chart pipeline and the CLI depend on [`MarketDataClient`], never on a
//! concrete provider, so tests can swap in scripted clients.

pub mod finnhub;

pub use finnhub::FinnhubClient;

use crate::error::ApiError;
use crate::filter::Resolution;
use crate::models::{CompanyProfile, Quote, RawSeries, SearchResults};

/// One request in, parsed payload or typed failure out. No retries, no
/// caching: every call goes to the source.
pub trait MarketDataClient: Send + Sync {
    /// Human-readable name of this client.
    fn name(&self) -> &str;

    /// Symbol search by free-text query.
    fn search_symbols(&self, query: &str) -> Result<SearchResults, ApiError>;

    /// Company profile for a ticker.
    fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, ApiError>;

    /// Latest quote for a ticker.
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, ApiError>;

    /// Candle series for a ticker over `[from, to]` (epoch seconds).
    fn fetch_historical_series(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<RawSeries, ApiError>;
}
