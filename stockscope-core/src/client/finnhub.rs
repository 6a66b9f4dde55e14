//! Finnhub REST client.
//!
//! Four GET endpoints, token passed as a query parameter. Any non-2xx status
//! becomes [`ApiError::Transport`]; there is no retry and, unless configured,
//! no timeout. Historical candles honour [`HistoryMode`]: in mock mode the
//! provider is never called and the static fallback series is returned.

use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::MarketDataClient;
use crate::config::{ClientConfig, HistoryMode};
use crate::error::ApiError;
use crate::fallback::fallback_series;
use crate::filter::Resolution;
use crate::models::{CompanyProfile, Quote, RawSeries, SearchResults};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct FinnhubClient {
    http: Client,
    config: ClientConfig,
}

impl FinnhubClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn search_url(&self, query: &str) -> Result<Url, ApiError> {
        self.endpoint("search", &[("q", query)])
    }

    pub fn profile_url(&self, symbol: &str) -> Result<Url, ApiError> {
        self.endpoint("stock/profile2", &[("symbol", symbol)])
    }

    pub fn quote_url(&self, symbol: &str) -> Result<Url, ApiError> {
        self.endpoint("quote", &[("symbol", symbol)])
    }

    pub fn candle_url(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Url, ApiError> {
        let from = from.to_string();
        let to = to.to_string();
        self.endpoint(
            "stock/candle",
            &[
                ("symbol", symbol),
                ("resolution", resolution.as_str()),
                ("from", &from),
                ("to", &to),
            ],
        )
    }

    /// `<base_url>/<path>?<params>&token=<token>`, values percent-encoded.
    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("token", &self.config.token);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        // The query string carries the token; only the path is logged.
        let path = url.path().to_string();
        debug!(%path, "GET");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| ApiError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%path, status = status.as_u16(), "provider returned an error status");
            return Err(ApiError::Transport {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .map_err(|e| ApiError::Shape(format!("{path}: {}", e.without_url())))
    }
}

impl MarketDataClient for FinnhubClient {
    fn name(&self) -> &str {
        "finnhub"
    }

    fn search_symbols(&self, query: &str) -> Result<SearchResults, ApiError> {
        self.get_json(self.search_url(query)?)
    }

    fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, ApiError> {
        self.get_json(self.profile_url(symbol)?)
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Quote, ApiError> {
        self.get_json(self.quote_url(symbol)?)
    }

    fn fetch_historical_series(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<RawSeries, ApiError> {
        match self.config.history_mode {
            HistoryMode::Mock => {
                debug!(symbol, %resolution, from, to, "history in mock mode; serving fallback series");
                Ok(fallback_series())
            }
            HistoryMode::Live => {
                let series: RawSeries =
                    self.get_json(self.candle_url(symbol, resolution, from, to)?)?;
                if !series.is_ok() {
                    warn!(
                        symbol,
                        status = series.status.as_deref().unwrap_or("<missing>"),
                        "candle endpoint returned a non-ok status; serving fallback series"
                    );
                    return Ok(fallback_series());
                }
                Ok(series)
            }
        }
    }
}
