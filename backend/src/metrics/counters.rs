use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility. Never read by the desk
/// itself; behavior must not depend on them.
#[derive(Clone, Default)]
pub struct Counters {
    // ticks by origin
    pub ticks_simulated: Arc<AtomicU64>,
    pub ticks_live: Arc<AtomicU64>,
    pub ticks_fallback: Arc<AtomicU64>,
    /// Fired while a feed fetch was still outstanding.
    pub ticks_dropped: Arc<AtomicU64>,

    pub inference_started: Arc<AtomicU64>,
    pub inference_failed: Arc<AtomicU64>,
    pub signals_emitted: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersSnapshot {
    pub ticks_simulated: u64,
    pub ticks_live: u64,
    pub ticks_fallback: u64,
    pub ticks_dropped: u64,
    pub inference_started: u64,
    pub inference_failed: u64,
    pub signals_emitted: u64,
}

impl Counters {
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CountersSnapshot {
            ticks_simulated: get(&self.ticks_simulated),
            ticks_live: get(&self.ticks_live),
            ticks_fallback: get(&self.ticks_fallback),
            ticks_dropped: get(&self.ticks_dropped),
            inference_started: get(&self.inference_started),
            inference_failed: get(&self.inference_failed),
            signals_emitted: get(&self.signals_emitted),
        }
    }
}
