//! Execution channel.
//!
//! A [`BuildChannel`] owns one background worker with its own runtime. The
//! host sends a [`BuildRequest`] and reads [`ChannelMessage`]s back in
//! order: zero or more progress lines, then exactly one terminal message.

mod message;
mod worker;

pub use message::{BuildRequest, ChannelMessage};
pub use worker::{BuildChannel, BuildRun};
