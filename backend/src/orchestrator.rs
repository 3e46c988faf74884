//! Event loop of the desk.
//!
//! Everything stateful (history, gate, current configuration) is owned by a
//! single task. Network calls run as spawned tasks whose handles are polled
//! from the same `select!`, so the timer keeps firing while they are out:
//!
//! - at most one feed fetch is outstanding; ticks firing meanwhile are
//!   dropped, not simulated;
//! - at most one inference call is outstanding, enforced by the gate;
//! - calls are never cancelled; a configuration change only re-arms the
//!   timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::logger::{TraceId, child_span, root_span};
use common::time::now_ms;
use futures::future::OptionFuture;
use market::{
    FeedApi, FeedError, FeedQuote, HistoryBuffer, HistoryError, Observation, Simulator,
    TickMode, TickOrigin, TickOutcome, TickSource,
};
use scheduler::{GatePolicy, InferenceApi, InferenceError, Signal, SignalGate};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{Instrument, debug, info, warn};

use crate::config::{AppConfig, FeedConfig};
use crate::desk_view::DeskView;
use crate::metrics::counters::Counters;

/// Width of the uniform step (±half) of the startup backfill walk.
pub const SEED_WALK_STEP: f64 = 10_000.0;

/// Startup and trigger parameters that do not change at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gate: GatePolicy,
    pub seed_count: usize,
    pub seed_spacing_ms: u64,
    pub initial_price: f64,
}

impl From<&AppConfig> for Settings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            gate: cfg.gate,
            seed_count: cfg.seed_count,
            seed_spacing_ms: cfg.seed_spacing_ms,
            initial_price: cfg.initial_price,
        }
    }
}

type FetchTask = JoinHandle<Result<FeedQuote, FeedError>>;
type InferenceTask = JoinHandle<Result<Signal, InferenceError>>;

pub struct Orchestrator<F, I> {
    ticks: TickSource<F>,
    inference: Arc<I>,
    settings: Settings,

    history: HistoryBuffer,
    current: Observation,
    gate: SignalGate,

    config: watch::Receiver<FeedConfig>,
    active: FeedConfig,

    pending_fetch: Option<FetchTask>,
    pending_inference: Option<InferenceTask>,

    view: DeskView,
}

impl<F: FeedApi, I: InferenceApi> Orchestrator<F, I> {
    pub fn new(
        feed: Arc<F>,
        inference: Arc<I>,
        simulator: Simulator,
        settings: Settings,
        mut config: watch::Receiver<FeedConfig>,
        view: DeskView,
    ) -> Self {
        let active = config.borrow_and_update().clone();
        view.set_simulation(active.is_simulation());

        Self {
            ticks: TickSource::new(feed, simulator),
            inference,
            gate: SignalGate::new(settings.gate),
            current: Observation::opening(now_ms(), settings.initial_price),
            settings,
            history: HistoryBuffer::new(),
            config,
            active,
            pending_fetch: None,
            pending_inference: None,
            view,
        }
    }

    /// Seeds the history and runs until `shutdown` resolves.
    pub async fn run<S>(mut self, shutdown: S) -> Result<(), HistoryError>
    where
        S: Future<Output = ()>,
    {
        self.bootstrap()?;

        let mut ticker = arm(self.active.poll_interval());
        let mut config_open = true;
        tokio::pin!(shutdown);

        loop {
            let cooldown = self.gate.cooldown_deadline();

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; stopping desk");
                    break;
                }

                _ = ticker.tick() => self.on_tick(),

                Some(res) = OptionFuture::from(self.pending_fetch.as_mut()) => {
                    self.pending_fetch = None;
                    self.on_fetch_settled(res);
                }

                Some(res) = OptionFuture::from(self.pending_inference.as_mut()) => {
                    self.pending_inference = None;
                    self.on_inference_settled(res);
                }

                _ = sleep_until(cooldown.unwrap_or_else(Instant::now)), if cooldown.is_some() => {
                    self.on_cooldown_elapsed();
                }

                changed = self.config.changed(), if config_open => match changed {
                    Ok(()) => {
                        if self.apply_config() {
                            ticker = arm(self.active.poll_interval());
                        }
                    }
                    Err(_) => {
                        debug!("configuration handle dropped; keeping last value");
                        config_open = false;
                    }
                },
            }
        }

        Ok(())
    }

    /// Backfills the history, publishes the first view and gives the gate
    /// its first look at the buffer.
    fn bootstrap(&mut self) -> Result<(), HistoryError> {
        let now = now_ms();
        let Settings {
            seed_count,
            seed_spacing_ms,
            initial_price,
            ..
        } = self.settings;

        let walk = self
            .ticks
            .simulator_mut()
            .seed_walk(initial_price, SEED_WALK_STEP);
        let seeded = self.history.seed(seed_count, seed_spacing_ms, now, walk)?;

        self.current = self
            .history
            .latest()
            .cloned()
            .unwrap_or_else(|| Observation::opening(now, initial_price));
        self.view.publish_market(&self.current, &self.history);

        info!(
            seeded,
            price = self.current.price,
            simulation = self.active.is_simulation(),
            poll_interval_ms = self.active.poll_interval_ms(),
            "desk started"
        );

        if seeded > 0 {
            self.evaluate_gate(seeded);
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        let span = root_span("tick", &TraceId::new());
        let _enter = span.enter();
        span.record(
            "mode",
            if self.active.is_simulation() { "simulation" } else { "live" },
        );

        if self.pending_fetch.is_some() {
            Counters::inc(&self.counters().ticks_dropped);
            debug!("feed fetch outstanding; tick dropped");
            return;
        }

        match self.active.tick_mode() {
            TickMode::Simulation => {
                let ts = self.next_ts();
                let outcome = self.ticks.simulate(&self.current, ts);
                self.ingest(outcome);
            }
            TickMode::Live { url } => {
                let fetch = self.ticks.fetch(&url).instrument(child_span("feed_fetch"));
                self.pending_fetch = Some(tokio::spawn(fetch));
            }
        }
    }

    fn on_fetch_settled(&mut self, res: Result<Result<FeedQuote, FeedError>, JoinError>) {
        let fetched = res.unwrap_or_else(|e| Err(FeedError::Aborted(e.to_string())));
        let ts = self.next_ts();
        let outcome = self.ticks.resolve(fetched, &self.current, ts);
        self.ingest(outcome);
    }

    fn ingest(&mut self, outcome: TickOutcome) {
        let counters = self.counters();
        match outcome.origin {
            TickOrigin::Simulated => Counters::inc(&counters.ticks_simulated),
            TickOrigin::Live => Counters::inc(&counters.ticks_live),
            TickOrigin::Fallback => Counters::inc(&counters.ticks_fallback),
        }

        let observation = outcome.observation;
        match self.history.append(observation.clone()) {
            Ok(appended) => {
                debug!(
                    price = observation.price,
                    len = appended.len,
                    origin = ?outcome.origin,
                    "observation appended"
                );
                self.current = observation;
                self.view.publish_market(&self.current, &self.history);
                self.evaluate_gate(appended.len);
            }
            Err(e) => warn!(error = %e, "observation rejected by history"),
        }
    }

    fn evaluate_gate(&mut self, len: usize) {
        if self.gate.on_appended(len, Instant::now()) {
            self.start_inference();
        }
    }

    fn start_inference(&mut self) {
        let window = self.history.snapshot();
        let api = Arc::clone(&self.inference);

        Counters::inc(&self.counters().inference_started);
        self.view.set_inference_in_flight(true);
        info!(points = window.len(), "inference call started");

        self.pending_inference = Some(tokio::spawn(async move {
            api.request_signal(&window).await
        }));
    }

    fn on_inference_settled(&mut self, res: Result<Result<Signal, InferenceError>, JoinError>) {
        self.gate.settle(Instant::now());
        self.view.set_inference_in_flight(false);

        match res.unwrap_or_else(|e| Err(InferenceError::Aborted(e.to_string()))) {
            Ok(signal) => {
                Counters::inc(&self.counters().signals_emitted);
                info!(
                    id = %signal.id,
                    action = %signal.action,
                    entry = signal.entry_price,
                    stop = signal.stop_loss,
                    target = signal.take_profit,
                    confidence = signal.confidence,
                    aggressive = signal.is_aggressive,
                    "signal emitted"
                );
                self.view.record_signal(signal);
            }
            Err(e) => {
                Counters::inc(&self.counters().inference_failed);
                warn!(error = %e, "inference failed; no signal emitted");
            }
        }
    }

    fn on_cooldown_elapsed(&mut self) {
        self.gate.expire(Instant::now());
    }

    /// Adopts the latest published configuration. Returns whether it differs
    /// from the active one; updates that cancel out leave the timer alone.
    fn apply_config(&mut self) -> bool {
        let next = self.config.borrow_and_update().clone();
        if next == self.active {
            debug!("configuration unchanged; timer left armed");
            return false;
        }

        info!(
            feed_url = %next.feed_url(),
            poll_interval_ms = next.poll_interval_ms(),
            simulation = next.is_simulation(),
            fetch_outstanding = self.pending_fetch.is_some(),
            "applying feed configuration; timer re-armed"
        );
        self.view.set_simulation(next.is_simulation());
        self.active = next;
        true
    }

    /// Wall-clock stamp for the next observation, forced past the tail.
    fn next_ts(&self) -> u64 {
        now_ms().max(self.current.ts_ms + 1)
    }

    fn counters(&self) -> Counters {
        self.view.counter_cells().clone()
    }
}

/// Periodic timer whose first firing is one full `period` from now.
fn arm(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
