//! Testing utilities for gateflow pipelines.
//!
//! This module provides:
//! - A scripted tool runner that answers invocations without processes
//! - Stub stages with call counting
//! - Fixture projects and parameters

mod fixtures;
mod mocks;

pub use fixtures::{blinky_parameters, blinky_sources, scripted_toolchain};
pub use mocks::{RecordedCall, ScriptedRunner, StubStage, ToolReply};
