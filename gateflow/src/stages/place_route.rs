//! Place-and-route adapter (nextpnr).

use super::runner::{ToolInvocation, ToolRunner};
use super::{expect_output, Stage, StageInput, StageResult};
use crate::config::ToolchainConfig;
use crate::core::{BuildParameters, StageKind};
use crate::events::ProgressSink;
use async_trait::async_trait;
use std::sync::Arc;

/// Progress prefix for place-and-route output.
pub const PLACE_ROUTE_TOOL: &str = "nextpnr";

/// Places and routes `<top>.json` into `<top>_pnr.json`.
///
/// Device and family are passed through verbatim; an unknown device is the
/// engine's failure to report.
#[derive(Debug, Clone)]
pub struct PlaceRouteStage {
    runner: Arc<dyn ToolRunner>,
    program: String,
}

impl PlaceRouteStage {
    /// Creates the adapter from toolchain settings.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ToolchainConfig) -> Self {
        Self {
            runner,
            program: config.nextpnr.clone(),
        }
    }

    /// Builds the invocation, binding `constraint` when present.
    #[must_use]
    pub fn invocation(&self, params: &BuildParameters, constraint: Option<&str>) -> ToolInvocation {
        let invocation = ToolInvocation::new(StageKind::PlaceRoute, PLACE_ROUTE_TOOL, &self.program)
            .args(["--json".to_string(), params.netlist_file_name()])
            .args(["--write".to_string(), params.routed_netlist_file_name()])
            .args(["--device", params.target_device.as_str()])
            .args(["--vopt".to_string(), format!("family={}", params.target_family)]);

        match constraint {
            Some(cst) => invocation.args(["--vopt".to_string(), format!("cst={cst}")]),
            None => invocation,
        }
    }
}

#[async_trait]
impl Stage for PlaceRouteStage {
    fn kind(&self) -> StageKind {
        StageKind::PlaceRoute
    }

    async fn run(&self, input: &StageInput<'_>, progress: &dyn ProgressSink) -> StageResult {
        let params = input.params;
        let invocation = self.invocation(params, input.constraint);

        let netlist = params.netlist_file_name();
        let inputs = input
            .files
            .subset(std::iter::once(netlist.as_str()).chain(input.constraint));

        let delta = self.runner.run(&invocation, &inputs, progress).await?;
        expect_output(StageKind::PlaceRoute, &delta, &params.routed_netlist_file_name())
    }
}
