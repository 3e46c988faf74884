use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid json from inference service: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("inference service returned no content")]
    Empty,

    #[error("response violates signal schema: {0}")]
    Schema(String),

    #[error("no observations to analyse")]
    EmptyWindow,

    #[error("inference task did not complete: {0}")]
    Aborted(String),
}
