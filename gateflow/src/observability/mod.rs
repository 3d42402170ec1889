//! Observability utilities.

mod subscriber;
mod timer;

pub use subscriber::{init_subscriber, LogFormat, DEFAULT_FILTER};
pub use timer::{RunTimer, StageTiming};
