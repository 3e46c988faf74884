//! Inference Adapter: turns a window of observations into a validated
//! [`Signal`] by way of an external structured-output reasoning service.

pub mod client;
pub mod errors;
pub mod prompt;
pub mod validate;

use async_trait::async_trait;
use market::Observation;

use crate::model::Signal;

pub use client::{DEFAULT_INFERENCE_URL, InferenceClient};
pub use errors::InferenceError;

/// Abstraction over the reasoning service.
///
/// Implementations must only return `Ok` for a fully validated signal; every
/// other outcome is an [`InferenceError`] and no signal may be fabricated.
#[async_trait]
pub trait InferenceApi: Send + Sync + 'static {
    async fn request_signal(&self, window: &[Observation]) -> Result<Signal, InferenceError>;
}
