pub mod client;
pub mod errors;
pub mod types;

use async_trait::async_trait;

pub use client::FeedClient;
pub use errors::FeedError;
pub use types::FeedQuote;

/// Source of live quotes.
///
/// Implementations report every failure mode (transport, status, payload)
/// as a [`FeedError`]; callers decide how to degrade.
#[async_trait]
pub trait FeedApi: Send + Sync + 'static {
    async fn fetch_quote(&self, url: &str) -> Result<FeedQuote, FeedError>;
}
