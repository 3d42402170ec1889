//! Pipeline coordinator: runs synthesis, place-and-route and pack in order.

use super::outcome::PipelineOutcome;
use super::state::PipelineState;
use crate::core::{BuildParameters, StageKind};
use crate::errors::StageError;
use crate::events::ProgressSink;
use crate::observability::{RunTimer, StageTiming};
use crate::resolve::{select_constraint_file, IncludeResolver};
use crate::stages::{StageInput, StageSet};
use crate::store::FileStore;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Identifier of the run, also recorded on its tracing span.
    pub run_id: Uuid,
    /// The terminal outcome.
    pub outcome: PipelineOutcome,
    /// Every state the run passed through, starting with `Idle`.
    pub states: Vec<PipelineState>,
    /// Timings of the stages that ran.
    pub timings: Vec<StageTiming>,
    /// Total wall time in milliseconds.
    pub duration_ms: f64,
}

impl PipelineReport {
    /// Returns the final state.
    #[must_use]
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or_default()
    }
}

/// Runs one build.
///
/// A coordinator is consumed by [`run`](Self::run); every build starts from
/// a fresh instance and a fresh store.
#[derive(Debug)]
pub struct PipelineCoordinator {
    stages: StageSet,
    resolver: IncludeResolver,
    run_id: Uuid,
    state: PipelineState,
    states: Vec<PipelineState>,
}

impl PipelineCoordinator {
    /// Creates a coordinator over `stages`.
    #[must_use]
    pub fn new(stages: StageSet) -> Self {
        Self {
            stages,
            resolver: IncludeResolver::default(),
            run_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            states: vec![PipelineState::Idle],
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs all three stages over `files`.
    ///
    /// Each stage's output is merged into the store before the next stage
    /// starts. The first failure ends the run; later stages never run.
    pub async fn run(
        self,
        files: FileStore,
        params: BuildParameters,
        progress: &dyn ProgressSink,
    ) -> PipelineReport {
        let span = tracing::info_span!(
            "pipeline.run",
            run_id = %self.run_id,
            top = %params.top_module_name,
            device = %params.target_device,
        );
        self.execute(files, params, progress).instrument(span).await
    }

    async fn execute(
        mut self,
        files: FileStore,
        params: BuildParameters,
        progress: &dyn ProgressSink,
    ) -> PipelineReport {
        let mut timer = RunTimer::start();
        info!(files = files.len(), bytes = files.total_bytes(), "Pipeline started");

        let mut store = files;
        for kind in StageKind::ALL {
            self.enter(PipelineState::running(kind));

            let roots = if kind == StageKind::Synthesis {
                self.resolver.roots(&store)
            } else {
                Vec::new()
            };
            let constraint = if kind == StageKind::PlaceRoute {
                select_constraint_file(&store, &params.constraint_file_name)
            } else {
                None
            };
            let input = StageInput::new(&store, &params)
                .with_roots(&roots)
                .with_constraint(constraint.as_deref());

            timer.begin_stage(kind);
            let result = self.stages.get(kind).run(&input, progress).await;
            let duration_ms = timer.end_stage();

            match result {
                Ok(delta) => {
                    info!(stage = %kind, duration_ms, produced = delta.len(), "Stage completed");
                    store.merge_in(delta);
                }
                Err(err) => {
                    error!(
                        stage = %err.stage,
                        kind = %err.kind,
                        duration_ms,
                        error = %err.message,
                        "Stage failed"
                    );
                    return self.fail(err, timer);
                }
            }
        }

        if !store.contains(&params.output_file_name) {
            let err = StageError::missing_output(StageKind::Pack, &params.output_file_name);
            error!(error = %err.message, "Artifact missing after pack");
            return self.fail(err, timer);
        }

        self.enter(PipelineState::Succeeded);
        info!(
            duration_ms = timer.total_ms(),
            output = %params.output_file_name,
            sha256 = %store.sha256_hex(&params.output_file_name).unwrap_or_default(),
            "Pipeline succeeded"
        );
        self.finish(
            PipelineOutcome::Succeeded {
                files: store,
                output_file_name: params.output_file_name,
            },
            timer,
        )
    }

    fn fail(mut self, err: StageError, timer: RunTimer) -> PipelineReport {
        self.enter(PipelineState::Failed);
        self.finish(PipelineOutcome::Failed(err), timer)
    }

    fn finish(self, outcome: PipelineOutcome, timer: RunTimer) -> PipelineReport {
        PipelineReport {
            run_id: self.run_id,
            outcome,
            states: self.states,
            duration_ms: timer.total_ms(),
            timings: timer.into_timings(),
        }
    }

    fn enter(&mut self, next: PipelineState) {
        let from = self.state;
        match self.state.transition(next) {
            Ok(()) => {
                debug!(%from, to = %next, terminal = next.is_terminal(), "Pipeline transition");
                self.states.push(next);
            }
            Err(err) => error!(error = %err, "Rejected pipeline transition"),
        }
    }
}
