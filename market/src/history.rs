//! Bounded, chronologically ordered price history.
//!
//! The buffer is the single owner of past observations. It is seeded once at
//! startup and afterwards only grows through [`HistoryBuffer::append`], which
//! evicts from the head (FIFO) once `capacity` is reached.

use std::collections::VecDeque;

use thiserror::Error;

use crate::types::Observation;

/// Number of observations retained.
pub const HISTORY_CAPACITY: usize = 50;

/// Placeholder volatility carried by seeded (backfilled) entries.
pub const SEED_VOLATILITY: f64 = 10.0;

#[derive(Error, Debug, PartialEq)]
pub enum HistoryError {
    #[error("observation at {ts_ms} is not after the tail at {tail_ms}")]
    NonMonotonic { ts_ms: u64, tail_ms: u64 },

    #[error("observation price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("history is already seeded")]
    AlreadySeeded,

    #[error("seed spacing must be positive when seeding more than one entry")]
    ZeroSpacing,
}

/// Emitted by every successful append; consumed by the signal gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    /// Buffer length after the append (and eviction).
    pub len: usize,

    /// Oldest observation dropped to stay within capacity, if any.
    pub evicted: Option<Observation>,
}

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Observation>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Adds `obs` at the tail and trims the head back to capacity.
    ///
    /// Rejects observations that would break chronological order or carry a
    /// non-positive price; the buffer is left untouched in that case.
    pub fn append(&mut self, obs: Observation) -> Result<Appended, HistoryError> {
        if !(obs.price.is_finite() && obs.price > 0.0) {
            return Err(HistoryError::InvalidPrice(obs.price));
        }
        if let Some(tail) = self.entries.back() {
            if obs.ts_ms <= tail.ts_ms {
                return Err(HistoryError::NonMonotonic {
                    ts_ms: obs.ts_ms,
                    tail_ms: tail.ts_ms,
                });
            }
        }

        self.entries.push_back(obs);

        let mut evicted = None;
        while self.entries.len() > self.capacity {
            evicted = self.entries.pop_front();
        }

        Ok(Appended {
            len: self.entries.len(),
            evicted,
        })
    }

    /// Backfills `n` synthetic observations spaced `spacing_ms` apart, the
    /// newest stamped `now_ms`.
    ///
    /// Prices are taken from `prices` in chronological order; seeding stops
    /// early if it runs dry. Seeded entries carry zero change and
    /// [`SEED_VOLATILITY`]; `high`/`low` accumulate across the seed.
    /// Only the newest `capacity` entries are kept. Returns the number of
    /// entries stored.
    pub fn seed(
        &mut self,
        n: usize,
        spacing_ms: u64,
        now_ms: u64,
        prices: impl IntoIterator<Item = f64>,
    ) -> Result<usize, HistoryError> {
        if !self.entries.is_empty() {
            return Err(HistoryError::AlreadySeeded);
        }
        if n > 1 && spacing_ms == 0 {
            return Err(HistoryError::ZeroSpacing);
        }

        let mut staged: VecDeque<Observation> = VecDeque::with_capacity(self.capacity + 1);
        let mut extrema: Option<(f64, f64)> = None;

        for (i, price) in prices.into_iter().take(n).enumerate() {
            if !(price.is_finite() && price > 0.0) {
                return Err(HistoryError::InvalidPrice(price));
            }

            let steps_back = (n - 1 - i) as u64;
            let ts_ms = now_ms.saturating_sub(steps_back.saturating_mul(spacing_ms));

            let (high, low) = match extrema {
                Some((h, l)) => (h.max(price), l.min(price)),
                None => (price, price),
            };
            extrema = Some((high, low));

            staged.push_back(Observation {
                ts_ms,
                price,
                change: 0.0,
                change_percent: 0.0,
                high,
                low,
                volatility: SEED_VOLATILITY,
            });
            if staged.len() > self.capacity {
                staged.pop_front();
            }
        }

        self.entries = staged;
        Ok(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Observation> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    /// Owned chronological copy of the whole buffer.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.entries.iter().cloned().collect()
    }

    /// The newest `n` observations, oldest first.
    pub fn window(&self, n: usize) -> Vec<Observation> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}
