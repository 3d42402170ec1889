//! End-to-end tests: real adapters over scripted tools, through the
//! coordinator and the execution channel.

#[cfg(test)]
mod tests {
    use crate::channel::{BuildChannel, BuildRequest, ChannelMessage};
    use crate::config::ToolchainConfig;
    use crate::core::{BuildParameters, StageKind};
    use crate::errors::GateflowError;
    use crate::events::CollectingProgressSink;
    use crate::pipeline::{PipelineCoordinator, PipelineOutcome, PipelineState};
    use crate::stages::StageSet;
    use crate::store::FileStore;
    use crate::testing::{
        blinky_parameters, blinky_sources, scripted_toolchain, ScriptedRunner, ToolReply,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn stage_set(config: &ToolchainConfig, runner: &Arc<ScriptedRunner>) -> StageSet {
        StageSet::from_toolchain(config, runner.clone())
    }

    #[tokio::test]
    async fn test_success_store_holds_all_three_artifacts() {
        let (config, runner) = scripted_toolchain("out.bin");
        let runner = Arc::new(runner);
        let sink = CollectingProgressSink::new();

        let report = PipelineCoordinator::new(stage_set(&config, &runner))
            .run(blinky_sources(), blinky_parameters(), &sink)
            .await;

        assert_eq!(report.final_state(), PipelineState::Succeeded);
        let files = report.outcome.into_result().unwrap();
        for path in ["top.v", "counter.v", "top.json", "top_pnr.json", "out.bin"] {
            assert!(files.contains(path), "missing {path}");
        }
        assert_eq!(
            runner.called_stages(),
            vec![StageKind::Synthesis, StageKind::PlaceRoute, StageKind::Pack]
        );
    }

    #[tokio::test]
    async fn test_synthesis_reads_only_roots_but_sees_all_sources() {
        let (config, runner) = scripted_toolchain("out.bin");
        let runner = Arc::new(runner);

        PipelineCoordinator::new(stage_set(&config, &runner))
            .run(blinky_sources(), blinky_parameters(), &CollectingProgressSink::new())
            .await;

        let synth = &runner.calls()[0];
        assert_eq!(synth.input_paths, vec!["counter.v", "top.v"]);
        assert_eq!(
            synth.args,
            vec!["-p", r#"read_verilog "top.v"; synth_gowin -top top -json top.json"#]
        );
    }

    #[tokio::test]
    async fn test_place_route_failure_short_circuits() {
        let config = ToolchainConfig::default();
        let runner = Arc::new(
            ScriptedRunner::new()
                .on(
                    config.yosys.clone(),
                    ToolReply::files(FileStore::new().with_file("top.json", "{}")),
                )
                .on(
                    config.nextpnr.clone(),
                    ToolReply::fail("ERROR: Invalid device DEV1").with_lines(["ERROR: Invalid device DEV1"]),
                ),
        );
        let sink = CollectingProgressSink::new();

        let report = PipelineCoordinator::new(stage_set(&config, &runner))
            .run(blinky_sources(), blinky_parameters(), &sink)
            .await;

        assert_eq!(report.final_state(), PipelineState::Failed);
        assert_eq!(report.timings.len(), 2);
        match &report.outcome {
            PipelineOutcome::Failed(err) => {
                assert_eq!(err.stage, StageKind::PlaceRoute);
                assert_eq!(err.message, "ERROR: Invalid device DEV1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!runner.called_stages().contains(&StageKind::Pack));
        assert!(sink.lines_for(StageKind::Pack).is_empty());
    }

    #[tokio::test]
    async fn test_constraint_fallback_is_bound() {
        let (config, runner) = scripted_toolchain("out.bin");
        let runner = Arc::new(runner);
        let files = blinky_sources().with_file("y.cst", "IO_LOC \"led\" 10;");
        let params = blinky_parameters().with_constraint_file("x.cst");

        PipelineCoordinator::new(stage_set(&config, &runner))
            .run(files, params, &CollectingProgressSink::new())
            .await;

        let pnr = &runner.calls()[1];
        assert_eq!(pnr.input_paths, vec!["top.json", "y.cst"]);
        assert!(pnr.args.contains(&"cst=y.cst".to_string()));
    }

    #[tokio::test]
    async fn test_end_to_end_without_constraints() {
        let (config, runner) = scripted_toolchain("out.bin");
        let runner = Arc::new(runner);
        let mut channel = BuildChannel::spawn(stage_set(&config, &runner)).unwrap();
        let request = BuildRequest::new(
            FileStore::new().with_file("top.v", "module top(output o); assign o = 1'b1; endmodule\n"),
            BuildParameters::new("top", "out.bin")
                .with_device("DEV1")
                .with_family("FAM1")
                .with_constraint_file("top.cst"),
        );

        let mut progress = Vec::new();
        let files = channel
            .start(request)
            .unwrap()
            .wait(|stage, text| progress.push((stage, text.to_string())))
            .await
            .unwrap();

        assert!(!files.get("out.bin").unwrap().is_empty());
        assert!(progress.iter().any(|(stage, _)| *stage == StageKind::Pack));

        let pnr = &runner.calls()[1];
        assert_eq!(pnr.input_paths, vec!["top.json"]);
        assert!(!pnr.args.iter().any(|a| a.starts_with("cst=")));
        assert!(pnr.args.contains(&"DEV1".to_string()));
        assert!(pnr.args.contains(&"family=FAM1".to_string()));
    }

    #[tokio::test]
    async fn test_channel_progress_in_order_then_terminal() {
        let (config, runner) = scripted_toolchain("out.bin");
        let mut channel = BuildChannel::spawn(StageSet::from_toolchain(&config, Arc::new(runner))).unwrap();
        let mut run = channel
            .start(BuildRequest::new(blinky_sources(), blinky_parameters()))
            .unwrap();

        let mut stages = Vec::new();
        let mut terminal = None;
        while let Some(message) = run.next().await.unwrap() {
            match message {
                ChannelMessage::Progress { stage, text } => {
                    assert!(terminal.is_none(), "progress after terminal: {text}");
                    stages.push(stage);
                }
                other => terminal = Some(other),
            }
        }

        assert!(matches!(terminal, Some(ChannelMessage::Success { .. })));
        let mut sorted = stages.clone();
        sorted.sort_by_key(|s| StageKind::ALL.iter().position(|k| k == s));
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&StageKind::Synthesis));
    }

    #[tokio::test]
    async fn test_channel_failure_returns_no_files() {
        let config = ToolchainConfig::default();
        let runner = ScriptedRunner::new()
            .on(
                config.yosys.clone(),
                ToolReply::files(FileStore::new().with_file("top.json", "{}")),
            )
            .on(config.nextpnr.clone(), ToolReply::fail("ERROR: Unable to place cell"));
        let mut channel = BuildChannel::spawn(StageSet::from_toolchain(&config, Arc::new(runner))).unwrap();

        let err = channel
            .start(BuildRequest::new(blinky_sources(), blinky_parameters()))
            .unwrap()
            .wait(|_, _| {})
            .await
            .unwrap_err();

        match err {
            GateflowError::BuildFailed { stage, message } => {
                assert_eq!(stage, Some(StageKind::PlaceRoute));
                assert!(message.contains("place-route"));
                assert!(message.contains("ERROR: Unable to place cell"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!channel.is_dead());
    }

    #[tokio::test]
    async fn test_missing_netlist_is_synthesis_failure() {
        let config = ToolchainConfig::default();
        let runner = Arc::new(ScriptedRunner::new().on(
            config.yosys.clone(),
            ToolReply::files(FileStore::new().with_file("yosys.log", "done")),
        ));

        let report = PipelineCoordinator::new(stage_set(&config, &runner))
            .run(blinky_sources(), blinky_parameters(), &CollectingProgressSink::new())
            .await;

        assert_eq!(report.outcome.failed_stage(), Some(StageKind::Synthesis));
        assert_eq!(runner.calls().len(), 1);
    }
}
