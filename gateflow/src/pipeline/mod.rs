//! Pipeline coordination.
//!
//! This module provides:
//! - The linear run state machine
//! - The coordinator that sequences the three stages over one file store
//! - The terminal outcome of a run

mod coordinator;
mod outcome;
mod state;

#[cfg(test)]
mod integration_tests;

pub use crate::observability::StageTiming;
pub use coordinator::{PipelineCoordinator, PipelineReport};
pub use outcome::PipelineOutcome;
pub use state::{InvalidTransition, PipelineState};
