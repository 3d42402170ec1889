//! Stage trait and the three engine adapters.
//!
//! Each adapter turns a file store and build parameters into one external
//! tool invocation, streams the tool's output as progress, and returns only
//! the files it is expected to produce.

mod pack;
mod place_route;
mod process;
mod runner;
mod synthesis;

pub use pack::{PackStage, PACK_TOOL};
pub use place_route::{PlaceRouteStage, PLACE_ROUTE_TOOL};
pub use process::ProcessRunner;
pub use runner::{FailureReport, ToolInvocation, ToolRunner};
pub use synthesis::{SynthesisStage, SYNTHESIS_TOOL};

use crate::config::ToolchainConfig;
use crate::core::{BuildParameters, StageKind};
use crate::errors::StageError;
use crate::events::ProgressSink;
use crate::store::FileStore;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Outcome of one stage: the files it produced, or why it failed.
pub type StageResult = Result<FileStore, StageError>;

/// Everything a stage may read.
///
/// The coordinator fills `roots` before synthesis and `constraint` before
/// place-and-route; other stages ignore them.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// The accumulated store. Stages never modify it.
    pub files: &'a FileStore,
    /// Parameters for the run.
    pub params: &'a BuildParameters,
    /// Root sources to read explicitly.
    pub roots: &'a [String],
    /// Selected constraint file, if any.
    pub constraint: Option<&'a str>,
}

impl<'a> StageInput<'a> {
    /// Creates an input with no roots and no constraint.
    #[must_use]
    pub fn new(files: &'a FileStore, params: &'a BuildParameters) -> Self {
        Self {
            files,
            params,
            roots: &[],
            constraint: None,
        }
    }

    /// Sets the root sources.
    #[must_use]
    pub fn with_roots(mut self, roots: &'a [String]) -> Self {
        self.roots = roots;
        self
    }

    /// Sets the constraint file.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Option<&'a str>) -> Self {
        self.constraint = constraint;
        self
    }
}

/// Trait for pipeline stages.
///
/// A stage returns only the delta it produced; merging is the caller's job.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns which stage this is.
    fn kind(&self) -> StageKind;

    /// Runs the stage.
    async fn run(&self, input: &StageInput<'_>, progress: &dyn ProgressSink) -> StageResult;
}

/// The three stages a pipeline runs, in order.
#[derive(Debug, Clone)]
pub struct StageSet {
    synthesis: Arc<dyn Stage>,
    place_route: Arc<dyn Stage>,
    pack: Arc<dyn Stage>,
}

impl StageSet {
    /// Creates a stage set from explicit stages.
    #[must_use]
    pub fn new(synthesis: Arc<dyn Stage>, place_route: Arc<dyn Stage>, pack: Arc<dyn Stage>) -> Self {
        Self {
            synthesis,
            place_route,
            pack,
        }
    }

    /// Creates the standard adapters over `runner`.
    #[must_use]
    pub fn from_toolchain(config: &ToolchainConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self::new(
            Arc::new(SynthesisStage::new(runner.clone(), config)),
            Arc::new(PlaceRouteStage::new(runner.clone(), config)),
            Arc::new(PackStage::new(runner, config)),
        )
    }

    /// Creates the standard adapters running real processes.
    #[must_use]
    pub fn with_processes(config: &ToolchainConfig) -> Self {
        Self::from_toolchain(config, Arc::new(ProcessRunner::new()))
    }

    /// Returns the stage for `kind`.
    #[must_use]
    pub fn get(&self, kind: StageKind) -> &Arc<dyn Stage> {
        match kind {
            StageKind::Synthesis => &self.synthesis,
            StageKind::PlaceRoute => &self.place_route,
            StageKind::Pack => &self.pack,
        }
    }
}

/// Keeps only `expected` from a tool's delta.
fn expect_output(stage: StageKind, delta: &FileStore, expected: &str) -> StageResult {
    if delta.contains(expected) {
        Ok(delta.subset([expected]))
    } else {
        Err(StageError::missing_output(stage, expected))
    }
}
