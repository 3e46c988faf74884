use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
    StrongBuy,
    StrongSell,
}

impl SignalAction {
    pub const ALL: [SignalAction; 5] = [
        SignalAction::Buy,
        SignalAction::Sell,
        SignalAction::Hold,
        SignalAction::StrongBuy,
        SignalAction::StrongSell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
            SignalAction::StrongBuy => "STRONG_BUY",
            SignalAction::StrongSell => "STRONG_SELL",
        }
    }

    /// +1 for long, -1 for short, 0 for HOLD.
    pub fn direction(&self) -> i8 {
        match self {
            SignalAction::Buy | SignalAction::StrongBuy => 1,
            SignalAction::Sell | SignalAction::StrongSell => -1,
            SignalAction::Hold => 0,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| format!("unknown action {s:?}"))
    }
}

/// A trading recommendation produced by the inference service.
///
/// Only the inference adapter constructs these, after validation; they are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: Uuid,
    #[serde(rename = "timestamp")]
    pub ts_ms: u64,
    pub action: SignalAction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// 0–100.
    pub confidence: f64,
    pub reasoning: String,
    pub is_aggressive: bool,
}

impl Signal {
    /// Stop below and target above entry for longs, mirrored for shorts.
    /// HOLD is always consistent.
    pub fn is_directionally_consistent(&self) -> bool {
        match self.action.direction() {
            1 => self.stop_loss < self.entry_price && self.take_profit > self.entry_price,
            -1 => self.stop_loss > self.entry_price && self.take_profit < self.entry_price,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(action: SignalAction, entry: f64, stop: f64, target: f64) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            ts_ms: 0,
            action,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            confidence: 80.0,
            reasoning: "الگوی پرچم صعودی".into(),
            is_aggressive: true,
        }
    }

    #[test]
    fn action_round_trips_through_wire_names() {
        for a in SignalAction::ALL {
            let json = serde_json::to_string(&a).unwrap();
            assert_eq!(json, format!("\"{}\"", a.as_str()));
            assert_eq!(a.as_str().parse::<SignalAction>().unwrap(), a);
        }
        assert!("BUY_NOW".parse::<SignalAction>().is_err());
    }

    #[test]
    fn directional_consistency() {
        assert!(signal(SignalAction::Buy, 100.0, 95.0, 110.0).is_directionally_consistent());
        assert!(!signal(SignalAction::StrongBuy, 100.0, 105.0, 110.0).is_directionally_consistent());
        assert!(signal(SignalAction::Sell, 100.0, 105.0, 90.0).is_directionally_consistent());
        assert!(!signal(SignalAction::StrongSell, 100.0, 95.0, 90.0).is_directionally_consistent());
        assert!(signal(SignalAction::Hold, 100.0, 150.0, 10.0).is_directionally_consistent());
    }

    #[test]
    fn serializes_presentation_shape() {
        let v = serde_json::to_value(signal(SignalAction::StrongSell, 10.0, 11.0, 9.0)).unwrap();
        assert_eq!(v["action"], "STRONG_SELL");
        assert_eq!(v["entryPrice"], 10.0);
        assert_eq!(v["isAggressive"], true);
        assert!(v.get("timestamp").is_some());
    }
}
