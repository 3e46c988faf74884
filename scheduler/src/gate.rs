//! Signal Scheduler: decides on every history append whether an inference
//! call is due.
//!
//! ```text
//!            len >= warmup            call settled
//!   IDLE ─────────────────▶ REQUESTING ────────────▶ COOLDOWN
//!    ▲                                                  │
//!    └──────────────── cooldown elapsed ────────────────┘
//! ```
//!
//! Safety properties:
//! - At most one call is in flight: triggers while REQUESTING are no-ops.
//! - A settled call (success or failure) blocks new calls for `cooldown`.
//!
//! The gate holds no clock of its own; every transition takes `now`, so the
//! owner decides whether that is real or virtual time.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Minimum history length before the first call.
pub const DEFAULT_WARMUP: usize = 10;

/// Quiet period after every settled call.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub warmup: usize,
    pub cooldown: Duration,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            warmup: DEFAULT_WARMUP,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Requesting,
    Cooldown { until: Instant },
}

#[derive(Debug)]
pub struct SignalGate {
    policy: GatePolicy,
    state: GateState,
}

impl SignalGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            state: GateState::Idle,
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self.state, GateState::Requesting)
    }

    /// When the current cooldown ends, if cooling down.
    pub fn cooldown_deadline(&self) -> Option<Instant> {
        match self.state {
            GateState::Cooldown { until } => Some(until),
            _ => None,
        }
    }

    /// Evaluates the trigger after an append that left the history at `len`.
    ///
    /// Returns `true` exactly when this call moved the gate IDLE → REQUESTING;
    /// the caller must then start one inference call.
    pub fn on_appended(&mut self, len: usize, now: Instant) -> bool {
        self.expire(now);

        if len < self.policy.warmup {
            debug!(len, warmup = self.policy.warmup, "history warming up");
            return false;
        }

        match self.state {
            GateState::Idle => {
                self.state = GateState::Requesting;
                debug!(len, "inference call triggered");
                true
            }
            GateState::Requesting => {
                debug!("inference call already in flight");
                false
            }
            GateState::Cooldown { until } => {
                debug!(
                    remaining_ms = until.saturating_duration_since(now).as_millis() as u64,
                    "inference cooling down"
                );
                false
            }
        }
    }

    /// REQUESTING → COOLDOWN, regardless of how the call ended.
    pub fn settle(&mut self, now: Instant) {
        match self.state {
            GateState::Requesting => {
                let until = now + self.policy.cooldown;
                self.state = GateState::Cooldown { until };
                debug!(
                    cooldown_ms = self.policy.cooldown.as_millis() as u64,
                    "inference cooldown started"
                );
            }
            other => warn!(state = ?other, "settle without a call in flight; ignored"),
        }
    }

    /// COOLDOWN → IDLE once the deadline has passed. Returns whether it fired.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            GateState::Cooldown { until } if now >= until => {
                self.state = GateState::Idle;
                debug!("inference cooldown elapsed");
                true
            }
            _ => false,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Event {
        Append { after_ms: u64 },
        Settle { after_ms: u64 },
        Expire { after_ms: u64 },
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (0u64..4_000).prop_map(|after_ms| Event::Append { after_ms }),
            (0u64..4_000).prop_map(|after_ms| Event::Settle { after_ms }),
            (0u64..12_000).prop_map(|after_ms| Event::Expire { after_ms }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]
        #[test]
        fn never_two_in_flight_and_cooldown_is_respected(
            events in prop::collection::vec(event(), 1..200),
        ) {
            let mut g = SignalGate::new(GatePolicy::default());
            let t0 = Instant::now();
            let mut now = t0;
            let mut len = 0usize;

            let mut in_flight = false;
            let mut last_settled: Option<Instant> = None;

            for ev in events {
                match ev {
                    Event::Append { after_ms } => {
                        now += Duration::from_millis(after_ms);
                        len = (len + 1).min(50);
                        if g.on_appended(len, now) {
                            prop_assert!(!in_flight, "second call started while one in flight");
                            prop_assert!(len >= DEFAULT_WARMUP);
                            if let Some(settled) = last_settled {
                                prop_assert!(now.duration_since(settled) >= DEFAULT_COOLDOWN);
                            }
                            in_flight = true;
                        }
                    }
                    Event::Settle { after_ms } => {
                        now += Duration::from_millis(after_ms);
                        if in_flight {
                            g.settle(now);
                            in_flight = false;
                            last_settled = Some(now);
                        }
                    }
                    Event::Expire { after_ms } => {
                        now += Duration::from_millis(after_ms);
                        g.expire(now);
                    }
                }
                prop_assert_eq!(g.is_requesting(), in_flight);
            }
        }
    }
}
