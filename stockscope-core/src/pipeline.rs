//! Chart pipeline: (symbol, filter) in, published chart state out.
//!
//! State machine: `Idle → Loading → {Ready | Failed}`, re-entering `Loading`
//! on every input change even while an earlier fetch is still out.
//!
//! Threading model:
//! - All state lives here and is mutated only by the owning thread.
//! - Each fetch runs on its own named worker thread and reports back over an
//!   `mpsc` channel, tagged with the generation it was started for.
//! - The owner applies completions in [`ChartPipeline::pump`] or
//!   [`ChartPipeline::wait_next`]. A completion whose generation is not the
//!   current one is dropped without touching state.
//! - Workers also check the shared generation before sending, so superseded
//!   results usually never reach the channel at all. Network calls are not
//!   aborted; their results are ignored.
//! - Teardown bumps the generation and drops the receiver. Late results go
//!   nowhere and observers are never called again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{to_chart_points, ChartPoint};
use crate::client::MarketDataClient;
use crate::config::ChartConfig;
use crate::dates::{Clock, DateFormat, DateRange, SystemClock};
use crate::error::ApiError;
use crate::filter::{FilterSpec, Resolution, INITIAL_FILTER};
use crate::models::RawSeries;

/// Upper bound on one blocking slice in `wait_next`, so an external
/// `FetchHandle::cancel` is noticed while waiting.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Where the pipeline is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartStatus {
    /// No symbol selected.
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Everything the pipeline owns about the current request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestState {
    pub data: Vec<ChartPoint>,
    pub loading: bool,
    pub error: Option<String>,
    pub generation: u64,
    pub status: ChartStatus,
}

impl RequestState {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            loading: false,
            error: None,
            generation: 0,
            status: ChartStatus::Idle,
        }
    }
}

/// What crosses the presentation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartView {
    pub data: Vec<ChartPoint>,
    pub loading: bool,
    pub error: Option<String>,
}

/// A fetch the pipeline started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRequest {
    pub symbol: String,
    pub filter: &'static str,
    pub resolution: Resolution,
    pub range: DateRange,
}

/// Result delivered by a worker.
#[derive(Debug)]
struct Completion {
    generation: u64,
    result: Result<RawSeries, ApiError>,
}

/// Generation of the last request whose outcome was applied.
///
/// Held while a completion is accepted and while a handle cancels, so a
/// request is either settled or cancelled, never both.
type Settled = Arc<Mutex<u64>>;

/// Disposer for one started request.
///
/// Cancelling invalidates the request if it is current and still loading;
/// the pipeline then drops its result, clears the chart and returns to
/// `Idle` on its next pump. Cancelling a request that has been superseded
/// or has already settled does nothing.
#[derive(Debug, Clone)]
pub struct FetchHandle {
    generation: u64,
    current: Arc<AtomicU64>,
    settled: Settled,
}

impl FetchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this is still the pipeline's latest request.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    /// Returns `true` if this call cancelled the request.
    pub fn cancel(&self) -> bool {
        let settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if *settled == self.generation {
            return false;
        }
        self.current
            .compare_exchange(
                self.generation,
                self.generation + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

type Observer = Box<dyn FnMut(&ChartView) + Send>;

pub struct ChartPipeline {
    client: Arc<dyn MarketDataClient>,
    clock: Arc<dyn Clock>,
    date_format: DateFormat,
    symbol: Option<String>,
    filter: String,
    state: RequestState,
    last_request: Option<ChartRequest>,
    /// Latest generation, shared with workers and handles.
    current: Arc<AtomicU64>,
    settled: Settled,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    observers: Vec<Observer>,
}

impl ChartPipeline {
    /// A pipeline on the wall clock, configured from `config`.
    pub fn new(client: Arc<dyn MarketDataClient>, config: &ChartConfig) -> Self {
        Self::with_clock(client, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        client: Arc<dyn MarketDataClient>,
        clock: Arc<dyn Clock>,
        config: &ChartConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let filter = if config.default_filter.is_empty() {
            INITIAL_FILTER.to_string()
        } else {
            config.default_filter.clone()
        };
        Self {
            client,
            clock,
            date_format: config.date_format.clone(),
            symbol: None,
            filter,
            state: RequestState::new(),
            last_request: None,
            current: Arc::new(AtomicU64::new(0)),
            settled: Arc::new(Mutex::new(0)),
            tx,
            rx,
            observers: Vec::new(),
        }
    }

    /// Register a callback invoked with the view after every published change.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&ChartView) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Filter names for rendering a selector, in display order.
    pub fn filter_names(&self) -> Vec<&'static str> {
        FilterSpec::names().collect()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn status(&self) -> ChartStatus {
        self.state.status
    }

    /// The request most recently started, if any.
    pub fn last_request(&self) -> Option<&ChartRequest> {
        self.last_request.as_ref()
    }

    pub fn view(&self) -> ChartView {
        ChartView {
            data: self.state.data.clone(),
            loading: self.state.loading,
            error: self.state.error.clone(),
        }
    }

    /// Change both inputs. Restarts only if either one actually changed.
    pub fn set_inputs(&mut self, symbol: Option<&str>, filter: &str) -> FetchHandle {
        let symbol = symbol.map(str::trim).filter(|s| !s.is_empty());
        if symbol == self.symbol.as_deref() && filter == self.filter {
            return self.current_handle();
        }
        self.symbol = symbol.map(str::to_string);
        self.filter = filter.to_string();
        self.restart()
    }

    pub fn set_symbol(&mut self, symbol: Option<&str>) -> FetchHandle {
        let filter = self.filter.clone();
        self.set_inputs(symbol, &filter)
    }

    /// The filter-change callback.
    pub fn set_filter(&mut self, filter: &str) -> FetchHandle {
        let symbol = self.symbol.clone();
        self.set_inputs(symbol.as_deref(), filter)
    }

    /// Start a new request for the current inputs even if nothing changed.
    pub fn refresh(&mut self) -> FetchHandle {
        self.restart()
    }

    fn current_handle(&self) -> FetchHandle {
        FetchHandle {
            generation: self.state.generation,
            current: Arc::clone(&self.current),
            settled: Arc::clone(&self.settled),
        }
    }

    fn restart(&mut self) -> FetchHandle {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.generation = generation;
        let handle = self.current_handle();

        let Some(symbol) = self.symbol.clone() else {
            // Nothing to load, so there is nothing left to cancel.
            self.settle(generation);
            self.last_request = None;
            self.state.data.clear();
            self.state.error = None;
            self.state.loading = false;
            self.state.status = ChartStatus::Idle;
            self.publish();
            return handle;
        };

        self.state.loading = true;
        self.state.error = None;
        self.state.status = ChartStatus::Loading;
        self.publish();

        let spec = FilterSpec::lookup(&self.filter);
        if spec.name != self.filter {
            warn!(filter = %self.filter, fallback = spec.name, "unknown filter; using default preset");
        }
        let range = spec.date_range(self.clock.now());
        let request = ChartRequest {
            symbol,
            filter: spec.name,
            resolution: spec.resolution,
            range,
        };
        info!(
            generation,
            symbol = %request.symbol,
            filter = request.filter,
            from = range.start,
            to = range.end,
            "fetching chart series"
        );

        if let Err(e) = self.spawn_fetch(generation, &request) {
            self.apply(Completion {
                generation,
                result: Err(ApiError::Network(format!("failed to start fetch: {e}"))),
            });
        }
        self.last_request = Some(request);
        handle
    }

    fn spawn_fetch(&self, generation: u64, request: &ChartRequest) -> std::io::Result<()> {
        let client = Arc::clone(&self.client);
        let current = Arc::clone(&self.current);
        let tx = self.tx.clone();
        let symbol = request.symbol.clone();
        let resolution = request.resolution;
        let range = request.range;

        thread::Builder::new()
            .name(format!("stockscope-fetch-{generation}"))
            .spawn(move || {
                let result =
                    client.fetch_historical_series(&symbol, resolution, range.start, range.end);
                if current.load(Ordering::SeqCst) != generation {
                    debug!(generation, "fetch superseded; dropping result");
                    return;
                }
                // The receiver is gone once the pipeline is torn down.
                let _ = tx.send(Completion { generation, result });
            })
            .map(|_| ())
    }

    /// Apply every completion that has arrived, without blocking.
    ///
    /// Returns how many completions changed state.
    pub fn pump(&mut self) -> usize {
        self.reconcile_cancelled();
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until the current request settles or `timeout` elapses.
    ///
    /// Returns `true` once nothing is loading. With `timeout = None` a hung
    /// request blocks until it resolves.
    pub fn wait_next(&mut self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            self.pump();
            if !self.state.loading {
                return true;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            match self.rx.recv_timeout(slice) {
                Ok(completion) => {
                    self.apply(completion);
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Unreachable while `self.tx` is alive.
                Err(RecvTimeoutError::Disconnected) => return !self.state.loading,
            }
        }
    }

    /// Tear down: outstanding results are discarded and observers are
    /// released. Dropping the pipeline has the same effect.
    pub fn shutdown(self) {
        info!(generation = self.state.generation, "chart pipeline shut down");
    }

    /// A handle cancelled the current request from outside.
    fn reconcile_cancelled(&mut self) {
        let current = self.current.load(Ordering::SeqCst);
        if current == self.state.generation {
            return;
        }
        debug!(
            cancelled = self.state.generation,
            current, "current request cancelled"
        );
        self.state.generation = current;
        if self.state.loading {
            // Whatever is still shown belongs to an earlier request, not to
            // the current inputs.
            self.state.data.clear();
            self.state.error = None;
            self.state.loading = false;
            self.state.status = ChartStatus::Idle;
            self.publish();
        }
    }

    /// Mark `generation` settled unless a handle cancelled it first.
    fn settle(&self, generation: u64) -> bool {
        let mut settled = self.settled.lock().unwrap_or_else(PoisonError::into_inner);
        if self.current.load(Ordering::SeqCst) != generation {
            return false;
        }
        *settled = generation;
        true
    }

    /// Apply one completion. Returns `false` for a stale one.
    fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.state.generation {
            debug!(
                stale = completion.generation,
                current = self.state.generation,
                "discarding stale completion"
            );
            return false;
        }
        if !self.settle(completion.generation) {
            debug!(generation = completion.generation, "request cancelled; dropping result");
            return false;
        }

        let mapped = completion
            .result
            .and_then(|series| to_chart_points(&series, &self.date_format));

        match mapped {
            Ok(points) => {
                debug!(generation = completion.generation, points = points.len(), "chart ready");
                self.state.data = points;
                self.state.error = None;
                self.state.status = ChartStatus::Ready;
            }
            Err(e) => {
                warn!(generation = completion.generation, error = %e, "chart fetch failed");
                self.state.data.clear();
                self.state.error = Some(e.to_string());
                self.state.status = ChartStatus::Failed;
            }
        }
        self.state.loading = false;
        self.publish();
        true
    }

    fn publish(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let view = self.view();
        for observer in &mut self.observers {
            observer(&view);
        }
    }
}

impl Drop for ChartPipeline {
    fn drop(&mut self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use crate::fallback::fallback_series;
    use crate::models::{CompanyProfile, Quote, SearchResults};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Answers every candle request with a fixed result.
    struct FixedClient(Result<RawSeries, ApiError>);

    impl MarketDataClient for FixedClient {
        fn name(&self) -> &str {
            "fixed"
        }
        fn search_symbols(&self, _: &str) -> Result<SearchResults, ApiError> {
            Ok(SearchResults::default())
        }
        fn fetch_profile(&self, _: &str) -> Result<CompanyProfile, ApiError> {
            Ok(CompanyProfile::default())
        }
        fn fetch_quote(&self, _: &str) -> Result<Quote, ApiError> {
            Ok(Quote::default())
        }
        fn fetch_historical_series(
            &self,
            _: &str,
            _: Resolution,
            _: i64,
            _: i64,
        ) -> Result<RawSeries, ApiError> {
            self.0.clone()
        }
    }

    fn pipeline(result: Result<RawSeries, ApiError>) -> ChartPipeline {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
        ChartPipeline::with_clock(
            Arc::new(FixedClient(result)),
            Arc::new(clock),
            &ChartConfig::default(),
        )
    }

    fn two_points() -> RawSeries {
        RawSeries {
            status: Some("ok".into()),
            close: Some(vec![100.005, 101.0]),
            timestamps: Some(vec![1_700_000_000, 1_700_003_600]),
            ..RawSeries::default()
        }
    }

    #[test]
    fn starts_idle_on_initial_filter() {
        let p = pipeline(Ok(two_points()));
        assert_eq!(p.status(), ChartStatus::Idle);
        assert_eq!(p.filter(), "1W");
        assert!(!p.view().loading);
        assert!(p.last_request().is_none());
    }

    #[test]
    fn filter_change_without_symbol_stays_idle() {
        let mut p = pipeline(Ok(two_points()));
        p.set_filter("1M");
        assert_eq!(p.status(), ChartStatus::Idle);
        assert!(!p.state().loading);
        assert_eq!(p.filter(), "1M");
    }

    #[test]
    fn symbol_enters_loading_then_ready() {
        let mut p = pipeline(Ok(two_points()));
        p.set_symbol(Some("AAPL"));
        assert_eq!(p.status(), ChartStatus::Loading);
        assert!(p.state().loading);
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        assert_eq!(p.status(), ChartStatus::Ready);
        let view = p.view();
        assert!(!view.loading);
        assert_eq!(view.error, None);
        assert_eq!(view.data.len(), 2);
        assert_eq!(view.data[0].value, "100.01");
        assert_eq!(view.data[1].value, "101.00");
    }

    #[test]
    fn request_uses_filter_resolution_and_range() {
        let mut p = pipeline(Ok(two_points()));
        p.set_inputs(Some("AAPL"), "1Y");
        let req = p.last_request().unwrap().clone();
        assert_eq!(req.symbol, "AAPL");
        assert_eq!(req.filter, "1Y");
        assert_eq!(req.resolution, Resolution::Daily);
        // 2023-05-10 to 2024-05-10 spans 29 February.
        assert_eq!(req.range.span_seconds(), 366 * 86_400);
    }

    #[test]
    fn unknown_filter_falls_back_to_default_preset() {
        let mut p = pipeline(Ok(two_points()));
        p.set_inputs(Some("AAPL"), "10Y");
        assert_eq!(p.last_request().unwrap().filter, "1M");
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        assert_eq!(p.status(), ChartStatus::Ready);
    }

    #[test]
    fn transport_failure_becomes_failed_state() {
        let mut p = pipeline(Err(ApiError::Transport { status: 500 }));
        p.set_symbol(Some("AAPL"));
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        assert_eq!(p.status(), ChartStatus::Failed);
        let view = p.view();
        assert!(!view.loading);
        assert!(view.data.is_empty());
        assert_eq!(view.error.as_deref(), Some("An error has occurred: 500"));
    }

    #[test]
    fn malformed_series_becomes_failed_state() {
        let mut p = pipeline(Ok(RawSeries {
            status: Some("ok".into()),
            ..RawSeries::default()
        }));
        p.set_symbol(Some("AAPL"));
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        assert_eq!(p.status(), ChartStatus::Failed);
        assert!(p.view().error.unwrap().contains("no close prices"));
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut p = pipeline(Ok(two_points()));
        let first = p.set_symbol(Some("AAPL"));
        let second = p.set_filter("1M");
        assert!(!first.is_current());
        assert!(second.is_current());

        let before = p.state().clone();
        let applied = p.apply(Completion {
            generation: first.generation(),
            result: Ok(fallback_series()),
        });
        assert!(!applied);
        assert_eq!(p.state(), &before);

        let applied = p.apply(Completion {
            generation: second.generation(),
            result: Ok(two_points()),
        });
        assert!(applied);
        assert_eq!(p.state().data.len(), 2);
    }

    #[test]
    fn unchanged_inputs_do_not_restart() {
        let mut p = pipeline(Ok(two_points()));
        let a = p.set_inputs(Some("AAPL"), "1W");
        let b = p.set_inputs(Some("AAPL"), "1W");
        assert_eq!(a.generation(), b.generation());
        let c = p.refresh();
        assert_eq!(c.generation(), a.generation() + 1);
    }

    #[test]
    fn blank_symbol_is_unset() {
        let mut p = pipeline(Ok(two_points()));
        p.set_symbol(Some("   "));
        assert_eq!(p.symbol(), None);
        assert_eq!(p.status(), ChartStatus::Idle);
    }

    #[test]
    fn clearing_symbol_returns_to_idle() {
        let mut p = pipeline(Ok(two_points()));
        p.set_symbol(Some("AAPL"));
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        p.set_symbol(None);
        assert_eq!(p.status(), ChartStatus::Idle);
        let view = p.view();
        assert!(!view.loading);
        assert!(view.data.is_empty());
    }

    #[test]
    fn cancelled_handle_clears_loading_on_pump() {
        let mut p = pipeline(Ok(two_points()));
        let handle = p.set_symbol(Some("AAPL"));
        assert!(handle.cancel());
        assert!(!handle.cancel());
        p.pump();
        assert!(!p.state().loading);
        assert_eq!(p.status(), ChartStatus::Idle);
        // Any late result of the cancelled request is ignored.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(p.pump(), 0);
        assert!(p.state().data.is_empty());
    }

    #[test]
    fn cancelling_filter_change_drops_previous_series() {
        let mut p = pipeline(Ok(fallback_series()));
        p.set_inputs(Some("AAPL"), "1W");
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        assert_eq!(p.view().data.len(), fallback_series().len());

        let handle = p.set_filter("1M");
        assert!(handle.cancel());
        p.pump();

        // The 1W points must not be presented as the 1M chart.
        assert_eq!(p.filter(), "1M");
        assert_eq!(p.status(), ChartStatus::Idle);
        let view = p.view();
        assert!(!view.loading);
        assert!(view.data.is_empty());
        assert_eq!(view.error, None);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(p.pump(), 0);
        assert!(p.view().data.is_empty());
    }

    #[test]
    fn cancelling_settled_request_is_noop() {
        let mut p = pipeline(Ok(two_points()));
        let handle = p.set_symbol(Some("AAPL"));
        assert!(p.wait_next(Some(Duration::from_secs(5))));
        let settled = p.state().clone();

        assert!(!handle.cancel());
        assert!(handle.is_current());
        assert_eq!(p.pump(), 0);
        assert_eq!(p.state(), &settled);
        assert_eq!(p.status(), ChartStatus::Ready);
    }

    #[test]
    fn cancelling_idle_request_is_noop() {
        let mut p = pipeline(Ok(two_points()));
        let handle = p.set_filter("1M");
        assert_eq!(p.status(), ChartStatus::Idle);
        assert!(!handle.cancel());
    }

    #[test]
    fn superseded_handle_cancel_is_noop() {
        let mut p = pipeline(Ok(two_points()));
        let first = p.set_symbol(Some("AAPL"));
        let second = p.set_filter("1M");
        assert!(!first.cancel());
        assert!(second.is_current());
    }

    #[test]
    fn observers_see_every_published_change() {
        let seen: Arc<Mutex<Vec<ChartView>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut p = pipeline(Ok(two_points()));
        p.subscribe(move |view| sink.lock().unwrap().push(view.clone()));

        p.set_symbol(Some("AAPL"));
        assert!(p.wait_next(Some(Duration::from_secs(5))));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].loading);
        assert!(!seen[1].loading);
        assert_eq!(seen[1].data.len(), 2);
    }

    #[test]
    fn exposes_filter_names() {
        let p = pipeline(Ok(two_points()));
        assert_eq!(p.filter_names(), vec!["1D", "1W", "1M", "3M", "1Y"]);
    }
}
