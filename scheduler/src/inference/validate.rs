//! Independent validation of the service's answer.
//!
//! Providers that promise schema-constrained output still occasionally
//! return partial objects; nothing becomes a [`Signal`] without passing here.

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::inference::errors::InferenceError;
use crate::model::{Signal, SignalAction};

/// The answer as received: every field optional so gaps surface as schema
/// errors naming the field rather than opaque decode errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignal {
    pub action: Option<String>,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub is_aggressive: Option<bool>,
}

/// Parses the model's text output (optionally wrapped in a code fence) and
/// validates it into a signal stamped `ts_ms` with a fresh id.
pub fn parse_signal(text: &str, ts_ms: u64) -> Result<Signal, InferenceError> {
    let raw: RawSignal = serde_json::from_str(strip_fence(text))?;
    validate(raw, ts_ms)
}

pub fn validate(raw: RawSignal, ts_ms: u64) -> Result<Signal, InferenceError> {
    let action: SignalAction = raw
        .action
        .as_deref()
        .ok_or_else(|| missing("action"))?
        .parse()
        .map_err(InferenceError::Schema)?;

    let entry_price = positive("entryPrice", raw.entry_price)?;
    let stop_loss = positive("stopLoss", raw.stop_loss)?;
    let take_profit = positive("takeProfit", raw.take_profit)?;

    let confidence = raw.confidence.ok_or_else(|| missing("confidence"))?;
    if !(confidence.is_finite() && (0.0..=100.0).contains(&confidence)) {
        return Err(InferenceError::Schema(format!(
            "confidence must be within 0-100, got {confidence}"
        )));
    }

    let reasoning = raw
        .reasoning
        .map(|r| r.trim().to_owned())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| missing("reasoning"))?;

    let is_aggressive = raw.is_aggressive.ok_or_else(|| missing("isAggressive"))?;

    let signal = Signal {
        id: Uuid::new_v4(),
        ts_ms,
        action,
        entry_price,
        stop_loss,
        take_profit,
        confidence,
        reasoning,
        is_aggressive,
    };

    if !signal.is_directionally_consistent() {
        warn!(
            action = %signal.action,
            entry = signal.entry_price,
            stop = signal.stop_loss,
            target = signal.take_profit,
            "signal levels inconsistent with its direction; accepted as-is"
        );
    }

    Ok(signal)
}

fn missing(field: &str) -> InferenceError {
    InferenceError::Schema(format!("missing or empty `{field}`"))
}

fn positive(field: &str, value: Option<f64>) -> Result<f64, InferenceError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(InferenceError::Schema(format!(
            "`{field}` must be a positive number, got {v}"
        ))),
        None => Err(missing(field)),
    }
}

fn strip_fence(text: &str) -> &str {
    let t = text.trim();
    match t.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => t,
    }
}
