//! Provider payload mapping.
//!
//! Feeds differ in shape: some return a single quote object, others a list
//! (bare or wrapped in `data` / `result`), and many encode numbers as strings
//! with thousands separators. Everything is reduced to a [`FeedQuote`].

use serde_json::Value;

use crate::feed::errors::FeedError;

const PRICE_KEYS: [&str; 4] = ["price", "close", "value", "p"];
const HIGH_KEYS: [&str; 2] = ["high", "max"];
const LOW_KEYS: [&str; 2] = ["low", "min"];
const ENVELOPE_KEYS: [&str; 2] = ["data", "result"];

/// Bounded by the number of envelopes a sane provider nests.
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuote {
    pub price: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl FeedQuote {
    pub fn from_json(value: &Value) -> Result<Self, FeedError> {
        Self::extract(value, 0)
    }

    fn extract(value: &Value, depth: usize) -> Result<Self, FeedError> {
        if depth > MAX_DEPTH {
            return Err(FeedError::MissingPrice);
        }

        match value {
            Value::Array(items) => match items.first() {
                Some(first) => Self::extract(first, depth + 1),
                None => Err(FeedError::MissingPrice),
            },
            Value::Object(map) => {
                if let Some(price) = first_number(map, &PRICE_KEYS) {
                    if !(price.is_finite() && price > 0.0) {
                        return Err(FeedError::InvalidPrice(price));
                    }
                    return Ok(Self {
                        price,
                        high: first_number(map, &HIGH_KEYS),
                        low: first_number(map, &LOW_KEYS),
                    });
                }

                ENVELOPE_KEYS
                    .iter()
                    .find_map(|k| map.get(*k))
                    .map_or(Err(FeedError::MissingPrice), |inner| {
                        Self::extract(inner, depth + 1)
                    })
            }
            _ => Err(FeedError::MissingPrice),
        }
    }
}

fn first_number(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k).and_then(as_number))
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_object() {
        let q = FeedQuote::from_json(&json!({"price": 101.5, "high": 110, "low": 90})).unwrap();
        assert_eq!(
            q,
            FeedQuote {
                price: 101.5,
                high: Some(110.0),
                low: Some(90.0)
            }
        );
    }

    #[test]
    fn data_envelope_uses_first_entry() {
        let v = json!({"data": [{"close": "487,810,000"}, {"close": "1"}]});
        let q = FeedQuote::from_json(&v).unwrap();
        assert_eq!(q.price, 487_810_000.0);
        assert_eq!(q.high, None);
    }

    #[test]
    fn nested_result_envelope() {
        let v = json!({"result": {"data": [{"value": 5, "max": "7", "min": "3"}]}});
        let q = FeedQuote::from_json(&v).unwrap();
        assert_eq!(q.price, 5.0);
        assert_eq!(q.high, Some(7.0));
        assert_eq!(q.low, Some(3.0));
    }

    #[test]
    fn bare_array() {
        let q = FeedQuote::from_json(&json!([{"p": 3}])).unwrap();
        assert_eq!(q.price, 3.0);
    }

    #[test]
    fn missing_price_is_an_error() {
        assert!(matches!(
            FeedQuote::from_json(&json!({"name": "gold"})),
            Err(FeedError::MissingPrice)
        ));
        assert!(matches!(
            FeedQuote::from_json(&json!([])),
            Err(FeedError::MissingPrice)
        ));
        assert!(matches!(
            FeedQuote::from_json(&json!({"price": "n/a"})),
            Err(FeedError::MissingPrice)
        ));
        assert!(matches!(
            FeedQuote::from_json(&json!(42)),
            Err(FeedError::MissingPrice)
        ));
    }

    #[test]
    fn non_positive_price_is_an_error() {
        assert!(matches!(
            FeedQuote::from_json(&json!({"price": -1})),
            Err(FeedError::InvalidPrice(_))
        ));
    }
}
