use std::time::Duration;

use async_trait::async_trait;
use common::logger::{TraceId, root_span, warn_if_slow};
use common::time::now_ms;
use market::Observation;
use reqwest::Client;
use serde::Deserialize;
use tracing::{Instrument, debug, info};

use crate::inference::InferenceApi;
use crate::inference::errors::InferenceError;
use crate::inference::{prompt, validate};
use crate::model::Signal;

pub const DEFAULT_INFERENCE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Upper bound on one call; an abandoned call still settles the gate.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SLOW_CALL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct InferenceClient {
    http: Client,
    url: String,
}

impl InferenceClient {
    pub fn new(url: impl Into<String>) -> Result<Self, InferenceError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl InferenceApi for InferenceClient {
    async fn request_signal(&self, window: &[Observation]) -> Result<Signal, InferenceError> {
        if window.is_empty() {
            return Err(InferenceError::EmptyWindow);
        }

        let trace_id = TraceId::new();
        let span = root_span("inference", &trace_id);

        async move {
            let body = prompt::build_request(window)?;
            debug!(points = window.len(), "requesting signal");

            let resp = warn_if_slow(
                "inference_request",
                SLOW_CALL,
                self.http.post(&self.url).json(&body).send(),
            )
            .await?
            .error_for_status()?;

            let bytes = resp.bytes().await?;
            let envelope: GenerateResponse = serde_json::from_slice(&bytes)?;
            let text = envelope.into_text().ok_or(InferenceError::Empty)?;

            let signal = validate::parse_signal(&text, now_ms())?;

            info!(
                id = %signal.id,
                action = %signal.action,
                entry = signal.entry_price,
                confidence = signal.confidence,
                "signal received"
            );

            Ok(signal)
        }
        .instrument(span)
        .await
    }
}
