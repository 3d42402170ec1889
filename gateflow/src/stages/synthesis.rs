//! Synthesis adapter (yosys).

use super::runner::{ToolInvocation, ToolRunner};
use super::{expect_output, Stage, StageInput, StageResult};
use crate::config::ToolchainConfig;
use crate::core::{BuildParameters, StageKind};
use crate::events::ProgressSink;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Progress prefix for synthesis output.
pub const SYNTHESIS_TOOL: &str = "yosys";

/// Reads each root source explicitly and synthesizes the top module into
/// `<top>.json`.
///
/// The whole store is made available to the tool so included files resolve.
#[derive(Debug, Clone)]
pub struct SynthesisStage {
    runner: Arc<dyn ToolRunner>,
    program: String,
    synth_command: String,
}

impl SynthesisStage {
    /// Creates the adapter from toolchain settings.
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, config: &ToolchainConfig) -> Self {
        Self {
            runner,
            program: config.yosys.clone(),
            synth_command: config.synth_command.clone(),
        }
    }

    /// Builds the yosys command script.
    #[must_use]
    pub fn script(&self, roots: &[String], params: &BuildParameters) -> String {
        let mut commands: Vec<String> = roots.iter().map(|f| format!("read_verilog \"{f}\"")).collect();
        commands.push(format!(
            "{} -top {} -json {}",
            self.synth_command,
            params.top_module_name,
            params.netlist_file_name()
        ));
        commands.join("; ")
    }

    /// Builds the invocation for `roots`.
    #[must_use]
    pub fn invocation(&self, roots: &[String], params: &BuildParameters) -> ToolInvocation {
        ToolInvocation::new(StageKind::Synthesis, SYNTHESIS_TOOL, &self.program)
            .arg("-p")
            .arg(self.script(roots, params))
    }
}

#[async_trait]
impl Stage for SynthesisStage {
    fn kind(&self) -> StageKind {
        StageKind::Synthesis
    }

    async fn run(&self, input: &StageInput<'_>, progress: &dyn ProgressSink) -> StageResult {
        let invocation = self.invocation(input.roots, input.params);
        debug!(roots = ?input.roots, "Running synthesis");

        let delta = self.runner.run(&invocation, input.files, progress).await?;
        expect_output(StageKind::Synthesis, &delta, &input.params.netlist_file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageErrorKind;
    use crate::events::CollectingProgressSink;
    use crate::store::FileStore;
    use crate::testing::{ScriptedRunner, ToolReply};
    use pretty_assertions::assert_eq;

    fn params() -> BuildParameters {
        BuildParameters::new("top", "out.bin")
    }

    #[test]
    fn test_script_reads_roots_then_synthesizes() {
        let stage = SynthesisStage::new(Arc::new(ScriptedRunner::new()), &ToolchainConfig::default());
        let roots = vec!["A.v".to_string(), "C.v".to_string()];

        assert_eq!(
            stage.script(&roots, &params()),
            r#"read_verilog "A.v"; read_verilog "C.v"; synth_gowin -top top -json top.json"#
        );

        let inv = stage.invocation(&roots, &params());
        assert_eq!(inv.program, "yosys");
        assert_eq!(inv.args[0], "-p");
    }

    #[test]
    fn test_script_quotes_paths_with_spaces() {
        let stage = SynthesisStage::new(Arc::new(ScriptedRunner::new()), &ToolchainConfig::default());
        let roots = vec!["my design/top level.v".to_string()];

        assert_eq!(
            stage.script(&roots, &params()),
            r#"read_verilog "my design/top level.v"; synth_gowin -top top -json top.json"#
        );
    }

    #[tokio::test]
    async fn test_run_passes_full_store_and_keeps_netlist_only() {
        let runner = Arc::new(ScriptedRunner::new().on(
            "yosys",
            ToolReply::files(FileStore::new().with_file("top.json", "{}").with_file("stray.log", "x"))
                .with_lines(["Executing SYNTH_GOWIN pass."]),
        ));
        let stage = SynthesisStage::new(runner.clone(), &ToolchainConfig::default());

        let files = FileStore::new()
            .with_file("top.v", "`include \"inc.v\"\n")
            .with_file("inc.v", "");
        let params = params();
        let roots = vec!["top.v".to_string()];
        let sink = CollectingProgressSink::new();

        let out = stage
            .run(&StageInput::new(&files, &params).with_roots(&roots), &sink)
            .await
            .unwrap();

        assert_eq!(out.paths().collect::<Vec<_>>(), vec!["top.json"]);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input_paths, vec!["inc.v", "top.v"]);
        assert_eq!(
            sink.lines_for(StageKind::Synthesis),
            vec!["[yosys] Executing SYNTH_GOWIN pass."]
        );
    }

    #[tokio::test]
    async fn test_missing_netlist_is_failure() {
        let runner = Arc::new(ScriptedRunner::new().on("yosys", ToolReply::files(FileStore::new())));
        let stage = SynthesisStage::new(runner, &ToolchainConfig::default());
        let files = FileStore::new();
        let params = params();

        let err = stage
            .run(&StageInput::new(&files, &params), &CollectingProgressSink::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, StageErrorKind::MissingOutput);
    }

    #[tokio::test]
    async fn test_engine_diagnostic_is_verbatim() {
        let runner = Arc::new(
            ScriptedRunner::new().on("yosys", ToolReply::fail("ERROR: syntax error, unexpected ';'")),
        );
        let stage = SynthesisStage::new(runner, &ToolchainConfig::default());
        let files = FileStore::new();
        let params = params();

        let err = stage
            .run(&StageInput::new(&files, &params), &CollectingProgressSink::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage, StageKind::Synthesis);
        assert_eq!(err.message, "ERROR: syntax error, unexpected ';'");
    }
}
