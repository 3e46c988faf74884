//! Random-walk price simulator.
//!
//! Used for simulation mode, for the per-tick fallback when the live feed is
//! unavailable, and for the synthetic backfill seeded at startup.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Observation;

/// Default per-tick step as a fraction of price (±0.05%).
pub const DEFAULT_STEP_SCALE: f64 = 0.0005;

/// Largest accepted step scale; keeps `price * (1 ± scale)` strictly positive.
pub const MAX_STEP_SCALE: f64 = 0.5;

pub struct Simulator {
    rng: StdRng,
    step_scale: f64,
}

impl Simulator {
    /// Simulator seeded from OS entropy.
    pub fn new(step_scale: f64) -> Self {
        Self::from_rng(StdRng::from_entropy(), step_scale)
    }

    /// Deterministic simulator, for tests and reproducible runs.
    pub fn with_seed(seed: u64, step_scale: f64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), step_scale)
    }

    fn from_rng(rng: StdRng, step_scale: f64) -> Self {
        let step_scale = if step_scale.is_finite() && step_scale > 0.0 {
            step_scale.min(MAX_STEP_SCALE)
        } else {
            DEFAULT_STEP_SCALE
        };
        Self { rng, step_scale }
    }

    pub fn step_scale(&self) -> f64 {
        self.step_scale
    }

    /// Produces the observation following `prev`.
    ///
    /// The price moves by `u * step_scale * price` with `u` uniform in
    /// [-1, 1); it therefore stays strictly positive.
    pub fn step(&mut self, prev: &Observation, ts_ms: u64) -> Observation {
        let u: f64 = self.rng.gen_range(-1.0..1.0);
        let candidate = prev.price * (1.0 + u * self.step_scale);

        let price = if candidate.is_finite() && candidate > 0.0 {
            candidate
        } else {
            prev.price
        };

        Observation::following(prev, ts_ms, price, None, None)
    }

    /// Endless random walk for backfilling history: each price moves from
    /// the last by a uniform step in ±`step / 2`, never dropping to zero.
    pub fn seed_walk(&mut self, start: f64, step: f64) -> SeedWalk<'_> {
        SeedWalk {
            rng: &mut self.rng,
            price: start,
            step,
        }
    }
}

pub struct SeedWalk<'a> {
    rng: &'a mut StdRng,
    price: f64,
    step: f64,
}

impl Iterator for SeedWalk<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let delta = self.rng.gen_range(-0.5..0.5) * self.step;
        let next = self.price + delta;
        if next.is_finite() && next > 0.0 {
            self.price = next;
        }
        Some(self.price)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]
        #[test]
        fn simulated_ticks_stay_positive_and_bounded(
            seed in any::<u64>(),
            start in 1.0f64..1.0e10,
            scale in 0.0001f64..=MAX_STEP_SCALE,
            steps in 1usize..300,
        ) {
            let mut sim = Simulator::with_seed(seed, scale);
            let mut prev = Observation::opening(0, start);

            for i in 0..steps {
                let next = sim.step(&prev, i as u64 + 1);
                prop_assert!(next.price > 0.0);
                prop_assert!((0.0..=100.0).contains(&next.volatility));
                prop_assert!(next.ts_ms > prev.ts_ms);
                prop_assert!(next.high >= prev.high);
                prop_assert!(next.low <= prev.low);
                prev = next;
            }
        }
    }
}
