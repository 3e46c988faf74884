use std::collections::VecDeque;

use crate::model::Signal;

/// Append-only record of every emitted signal, newest first.
///
/// Unbounded for the lifetime of the process; nothing is ever removed.
#[derive(Debug, Default, Clone)]
pub struct SignalLog {
    entries: VecDeque<Signal>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, signal: Signal) {
        self.entries.push_front(signal);
    }

    pub fn latest(&self) -> Option<&Signal> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.entries.iter()
    }

    /// Owned copy, most recent first.
    pub fn snapshot(&self) -> Vec<Signal> {
        self.entries.iter().cloned().collect()
    }
}
