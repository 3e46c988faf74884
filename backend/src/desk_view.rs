//! Read model handed to the presentation layer.
//!
//! The orchestrator is the only writer; readers get owned copies so no lock
//! is held across their own work.

use std::sync::Arc;

use market::{HistoryBuffer, Observation};
use parking_lot::RwLock;
use scheduler::{Signal, SignalLog};

use crate::metrics::counters::{Counters, CountersSnapshot};

#[derive(Default)]
struct DeskState {
    current: Option<Observation>,
    history: Vec<Observation>,
    signals: SignalLog,
    inference_in_flight: bool,
    simulation: bool,
}

#[derive(Clone, Default)]
pub struct DeskView {
    inner: Arc<RwLock<DeskState>>,
    counters: Counters,
}

impl DeskView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest observation, once the desk has started.
    pub fn current(&self) -> Option<Observation> {
        self.inner.read().current.clone()
    }

    /// History snapshot, oldest first.
    pub fn history(&self) -> Vec<Observation> {
        self.inner.read().history.clone()
    }

    pub fn latest_signal(&self) -> Option<Signal> {
        self.inner.read().signals.latest().cloned()
    }

    /// Every signal emitted so far, most recent first.
    pub fn signals(&self) -> Vec<Signal> {
        self.inner.read().signals.snapshot()
    }

    pub fn is_inference_in_flight(&self) -> bool {
        self.inner.read().inference_in_flight
    }

    pub fn is_simulation(&self) -> bool {
        self.inner.read().simulation
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub(crate) fn counter_cells(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn publish_market(&self, current: &Observation, history: &HistoryBuffer) {
        let mut g = self.inner.write();
        g.current = Some(current.clone());
        g.history = history.snapshot();
    }

    pub(crate) fn record_signal(&self, signal: Signal) {
        self.inner.write().signals.record(signal);
    }

    pub(crate) fn set_inference_in_flight(&self, in_flight: bool) {
        self.inner.write().inference_in_flight = in_flight;
    }

    pub(crate) fn set_simulation(&self, simulation: bool) {
        self.inner.write().simulation = simulation;
    }
}
