//! Tick Source: one observation per timer firing.
//!
//! Live mode fetches a quote from the configured feed; any failure is
//! answered with a simulated step for that tick only, so producing a tick
//! never fails. The fetch is exposed separately as a `'static` future so the
//! caller can run it concurrently with its own timer.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use crate::feed::{FeedApi, FeedError, FeedQuote};
use crate::simulator::Simulator;
use crate::types::Observation;

/// How ticks are sourced, derived from the active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickMode {
    Simulation,
    Live { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOrigin {
    /// Simulation mode.
    Simulated,
    /// Live quote from the feed.
    Live,
    /// Live mode, but the feed failed and a simulated step was substituted.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub observation: Observation,
    pub origin: TickOrigin,
}

pub struct TickSource<F> {
    feed: Arc<F>,
    simulator: Simulator,
}

impl<F: FeedApi> TickSource<F> {
    pub fn new(feed: Arc<F>, simulator: Simulator) -> Self {
        Self { feed, simulator }
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    /// Full tick contract: fetch when live, fall back to simulation.
    ///
    /// Sequential form: awaits the fetch in place. Event loops that must keep
    /// their timer running compose [`Self::fetch`] and [`Self::resolve`]
    /// instead.
    pub async fn produce_tick(
        &mut self,
        mode: &TickMode,
        prev: &Observation,
        ts_ms: u64,
    ) -> TickOutcome {
        match mode {
            TickMode::Simulation => self.simulate(prev, ts_ms),
            TickMode::Live { url } => {
                let fetched = self.fetch(url).await;
                self.resolve(fetched, prev, ts_ms)
            }
        }
    }

    pub fn simulate(&mut self, prev: &Observation, ts_ms: u64) -> TickOutcome {
        TickOutcome {
            observation: self.simulator.step(prev, ts_ms),
            origin: TickOrigin::Simulated,
        }
    }

    /// Detached feed request; owns everything it needs.
    pub fn fetch(&self, url: &str) -> BoxFuture<'static, Result<FeedQuote, FeedError>> {
        let feed = Arc::clone(&self.feed);
        let url = url.to_owned();
        Box::pin(async move { feed.fetch_quote(&url).await })
    }

    /// Turns a settled fetch into an observation following `prev`.
    pub fn resolve(
        &mut self,
        fetched: Result<FeedQuote, FeedError>,
        prev: &Observation,
        ts_ms: u64,
    ) -> TickOutcome {
        match fetched {
            Ok(quote) => TickOutcome {
                observation: Observation::following(prev, ts_ms, quote.price, quote.high, quote.low),
                origin: TickOrigin::Live,
            },
            Err(e) => {
                warn!(error = %e, "feed unavailable; substituting simulated tick");
                TickOutcome {
                    observation: self.simulator.step(prev, ts_ms),
                    origin: TickOrigin::Fallback,
                }
            }
        }
    }
}
