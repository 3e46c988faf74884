//! Signal side of the desk: the cooldown-gated trigger, the inference
//! adapter that turns a price window into a [`model::Signal`], and the
//! append-only signal log.

pub mod gate;
pub mod inference;
pub mod log;
pub mod model;

pub use gate::{GatePolicy, GateState, SignalGate};
pub use inference::{DEFAULT_INFERENCE_URL, InferenceApi, InferenceClient, InferenceError};
pub use log::SignalLog;
pub use model::{Signal, SignalAction};
