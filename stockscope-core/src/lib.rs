//! StockScope Core — market data client and chart pipeline.
//!
//! This crate contains:
//! - A provider client (symbol search, company profile, quote, candles)
//!   behind the [`MarketDataClient`] trait
//! - Time-range filter presets and calendar range computation
//! - Reshaping of candle series into chart points
//! - The cancellable chart pipeline that turns (symbol, filter) changes into
//!   published loading / error / data state
//! - Layered configuration (defaults, TOML, environment)

pub mod chart;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod models;
pub mod pipeline;

pub use chart::{format_value, to_chart_points, ChartPoint};
pub use client::{FinnhubClient, MarketDataClient};
pub use config::{ChartConfig, ClientConfig, Config, HistoryMode};
pub use dates::{Clock, DateFormat, DateRange, FixedClock, SystemClock};
pub use error::{ApiError, ConfigError};
pub use fallback::fallback_series;
pub use filter::{FilterSpec, Resolution, DEFAULT_FILTER, FILTERS, INITIAL_FILTER};
pub use models::{CompanyProfile, Quote, RawSeries, SearchResults, SymbolMatch};
pub use pipeline::{ChartPipeline, ChartRequest, ChartStatus, ChartView, FetchHandle, RequestState};
