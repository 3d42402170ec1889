//! Core domain model types for gateflow.
//!
//! This module contains the fundamental types shared by every component:
//! - Stage identity
//! - Build parameters
//! - Progress events

mod event;
mod params;
mod stage;

pub use event::ProgressEvent;
pub use params::BuildParameters;
pub use stage::StageKind;
