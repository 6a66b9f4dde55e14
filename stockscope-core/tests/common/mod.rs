//! Shared test clients.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use stockscope_core::{
    ApiError, CompanyProfile, FixedClock, MarketDataClient, Quote, RawSeries, Resolution,
    SearchResults,
};

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()))
}

/// `n` samples one hour apart, all closing at `value`.
pub fn flat_series(value: f64, n: usize) -> RawSeries {
    RawSeries {
        status: Some("ok".into()),
        close: Some(vec![value; n]),
        timestamps: Some((0..n as i64).map(|i| 1_700_000_000 + i * 3600).collect()),
        ..RawSeries::default()
    }
}

type Gate = Receiver<Result<RawSeries, ApiError>>;

/// Candle requests block until the test releases the gate registered for
/// their resolution. Every returning call is reported on a channel.
pub struct GatedClient {
    gates: Mutex<HashMap<Resolution, Gate>>,
    calls: Mutex<Vec<(String, Resolution, i64, i64)>>,
    returned: Mutex<Sender<Resolution>>,
}

impl GatedClient {
    pub fn new() -> (Arc<Self>, Receiver<Resolution>) {
        let (tx, rx) = mpsc::channel();
        let client = Self {
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            returned: Mutex::new(tx),
        };
        (Arc::new(client), rx)
    }

    /// Register a gate; sending on the returned sender releases the request.
    pub fn gate(&self, resolution: Resolution) -> Sender<Result<RawSeries, ApiError>> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(resolution, rx);
        tx
    }

    pub fn calls(&self) -> Vec<(String, Resolution, i64, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MarketDataClient for GatedClient {
    fn name(&self) -> &str {
        "gated"
    }

    fn search_symbols(&self, _query: &str) -> Result<SearchResults, ApiError> {
        Ok(SearchResults::default())
    }

    fn fetch_profile(&self, _symbol: &str) -> Result<CompanyProfile, ApiError> {
        Ok(CompanyProfile::default())
    }

    fn fetch_quote(&self, _symbol: &str) -> Result<Quote, ApiError> {
        Ok(Quote::default())
    }

    fn fetch_historical_series(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<RawSeries, ApiError> {
        let gate = self.gates.lock().unwrap().remove(&resolution);
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), resolution, from, to));

        let result = match gate {
            Some(gate) => gate
                .recv()
                .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".into()))),
            None => Err(ApiError::Shape(format!("no gate for resolution {resolution}"))),
        };
        let _ = self.returned.lock().unwrap().send(resolution);
        result
    }
}
