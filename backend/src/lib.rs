//! Gold Hunter desk: configuration, the presentation read model and the
//! orchestrator that drives ticks, history and signal requests.

pub mod config;
pub mod desk_view;
pub mod error;
pub mod metrics;
pub mod orchestrator;
