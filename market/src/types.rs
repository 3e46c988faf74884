use serde::{Deserialize, Serialize};

/// Instantaneous volatility score reached by a 0.5% move between two ticks.
const VOLATILITY_GAIN: f64 = 200.0;

/// Weight of the newest move in the volatility moving average.
const VOLATILITY_SMOOTHING: f64 = 0.3;

/// A single market price sample with its derived statistics.
///
/// Serialized in camelCase because the same shape is sent to the inference
/// service and handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Wall-clock milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub ts_ms: u64,

    pub price: f64,

    /// Signed delta from the previous observation.
    pub change: f64,
    pub change_percent: f64,

    /// Running extrema over the process lifetime (never reset).
    pub high: f64,
    pub low: f64,

    /// Heuristic score in [0, 100].
    pub volatility: f64,
}

impl Observation {
    /// A flat observation with no predecessor.
    pub fn opening(ts_ms: u64, price: f64) -> Self {
        Self {
            ts_ms,
            price,
            change: 0.0,
            change_percent: 0.0,
            high: price,
            low: price,
            volatility: 0.0,
        }
    }

    /// Builds the observation that follows `prev` at `price`.
    ///
    /// `change`, `change_percent` and `volatility` are always derived from
    /// `prev`. Reported extrema (e.g. a feed's daily high/low) are folded into
    /// the running extrema but can never shrink them. The timestamp is bumped
    /// past `prev` when the clock has not advanced.
    pub fn following(
        prev: &Observation,
        ts_ms: u64,
        price: f64,
        reported_high: Option<f64>,
        reported_low: Option<f64>,
    ) -> Self {
        let ts_ms = ts_ms.max(prev.ts_ms.saturating_add(1));

        let change = price - prev.price;
        let change_percent = if prev.price > 0.0 {
            change / prev.price * 100.0
        } else {
            0.0
        };

        let high = reported_high
            .filter(|v| v.is_finite() && *v > 0.0)
            .into_iter()
            .fold(prev.high.max(price), f64::max);
        let low = reported_low
            .filter(|v| v.is_finite() && *v > 0.0)
            .into_iter()
            .fold(prev.low.min(price), f64::min);

        Self {
            ts_ms,
            price,
            change,
            change_percent,
            high,
            low,
            volatility: next_volatility(prev.volatility, change_percent),
        }
    }
}

/// Exponential moving average of the per-tick move, clamped to [0, 100].
fn next_volatility(prev: f64, change_percent: f64) -> f64 {
    let instant = (change_percent.abs() * VOLATILITY_GAIN).min(100.0);
    let prev = if prev.is_finite() { prev.clamp(0.0, 100.0) } else { 0.0 };
    let score = prev * (1.0 - VOLATILITY_SMOOTHING) + instant * VOLATILITY_SMOOTHING;
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        prev
    }
}
