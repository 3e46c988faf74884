use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::feed::FeedApi;
use crate::feed::errors::FeedError;
use crate::feed::types::FeedQuote;

#[derive(Clone)]
pub struct FeedClient {
    http: Client,
}

impl FeedClient {
    pub fn new() -> Result<Self, FeedError> {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FeedError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl FeedApi for FeedClient {
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn fetch_quote(&self, url: &str) -> Result<FeedQuote, FeedError> {
        let resp = self.http.get(url).send().await?.error_for_status()?;

        let body = resp.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        let quote = FeedQuote::from_json(&value)?;

        debug!(
            price = quote.price,
            high = ?quote.high,
            low = ?quote.low,
            "feed quote fetched"
        );

        Ok(quote)
    }
}
