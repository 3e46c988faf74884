//! Request construction for a `generateContent`-style endpoint with a
//! constrained JSON response schema.

use market::Observation;
use serde_json::{Value, json};

use crate::inference::errors::InferenceError;
use crate::model::SignalAction;

/// Points the instruction tells the model to concentrate on.
pub const ANALYSIS_WINDOW: usize = 20;

pub const SYSTEM_INSTRUCTION: &str = "\
You are \"The Hunter\", an elite, aggressive scalper for the Tehran melted-gold market (Ab Shodeh).
Predict short-term price movements and commit to a call. Do not hedge. Be decisive.
Analyze the most recent 20 price points provided.
If volatility is high, look for breakout entries. If the market is ranging, look for support/resistance bounces.
Your tone is sharp, professional and confident.
Output strictly JSON matching the response schema.
The 'reasoning' field MUST be written in Persian (Farsi); never use English there.
Explain the pattern behind the entry (e.g. bull flag, double bottom) in Persian.
Prices are in Rials (large numbers).";

/// JSON schema the service must constrain its answer to.
pub fn response_schema() -> Value {
    let actions: Vec<&str> = SignalAction::ALL.iter().map(|a| a.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "action": { "type": "STRING", "enum": actions },
            "entryPrice": { "type": "NUMBER" },
            "stopLoss": { "type": "NUMBER" },
            "takeProfit": { "type": "NUMBER" },
            "confidence": { "type": "NUMBER", "description": "0-100" },
            "reasoning": { "type": "STRING", "description": "Persian-language analysis" },
            "isAggressive": { "type": "BOOLEAN" }
        },
        "required": [
            "action", "entryPrice", "stopLoss", "takeProfit",
            "confidence", "reasoning", "isAggressive"
        ]
    })
}

/// Full request body for `window` (oldest first).
pub fn build_request(window: &[Observation]) -> Result<Value, InferenceError> {
    let latest = window.last().ok_or(InferenceError::EmptyWindow)?;
    let data = serde_json::to_string(window)?;

    let prompt = format!(
        "Analyze these {} price points (oldest first); focus on the most recent {}.\n\
         Current price: {}. Current volatility: {:.1}/100.\n\
         Data: {}",
        window.len(),
        ANALYSIS_WINDOW.min(window.len()),
        latest.price,
        latest.volatility,
        data
    );

    Ok(json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(n: u64) -> Vec<Observation> {
        (1..=n)
            .map(|ts| Observation::opening(ts, 1_000.0 + ts as f64))
            .collect()
    }

    #[test]
    fn request_carries_instruction_schema_and_data() {
        let body = build_request(&window(30)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            SYSTEM_INSTRUCTION
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"]
                .as_array()
                .unwrap()
                .len(),
            7
        );

        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Analyze these 30 price points"));
        assert!(prompt.contains("most recent 20"));
        assert!(prompt.contains("\"changePercent\""));
        assert!(prompt.contains("Current price: 1030"));
    }

    #[test]
    fn schema_enumerates_every_action() {
        let schema = response_schema();
        let actions = schema["properties"]["action"]["enum"].as_array().unwrap();
        assert_eq!(actions.len(), SignalAction::ALL.len());
        assert!(actions.iter().any(|a| a == "STRONG_SELL"));
    }

    #[test]
    fn empty_window_is_rejected() {
        assert!(matches!(build_request(&[]), Err(InferenceError::EmptyWindow)));
    }
}
