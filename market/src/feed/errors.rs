use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid json from feed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("feed payload carries no usable price")]
    MissingPrice,

    #[error("feed reported a non-positive price: {0}")]
    InvalidPrice(f64),

    #[error("feed task did not complete: {0}")]
    Aborted(String),
}
