//! Progress sinks.
//!
//! Stages stream human-readable lines while they run. A sink receives them
//! in emission order; the execution channel forwards them to the host.

mod sink;

pub use sink::{CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink};
