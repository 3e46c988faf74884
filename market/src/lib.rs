//! Market data acquisition: the observation model, the bounded price
//! history, the random-walk simulator and the live feed client, combined
//! behind [`tick::TickSource`].

pub mod feed;
pub mod history;
pub mod simulator;
pub mod tick;
pub mod types;

pub use feed::{FeedApi, FeedClient, FeedError, FeedQuote};
pub use history::{Appended, HISTORY_CAPACITY, HistoryBuffer, HistoryError};
pub use simulator::Simulator;
pub use tick::{TickMode, TickOrigin, TickOutcome, TickSource};
pub use types::Observation;
