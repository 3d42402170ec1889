//! Wall-clock timing for pipeline runs.

use crate::core::StageKind;
use std::time::Instant;

/// How long one stage took.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    /// The stage.
    pub stage: StageKind,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

/// Times a whole run and each stage inside it.
#[derive(Debug)]
pub struct RunTimer {
    started: Instant,
    open: Option<(StageKind, Instant)>,
    timings: Vec<StageTiming>,
}

impl RunTimer {
    /// Starts timing a run.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            open: None,
            timings: Vec::new(),
        }
    }

    /// Starts timing `stage`, closing any stage still open.
    pub fn begin_stage(&mut self, stage: StageKind) {
        self.end_stage();
        self.open = Some((stage, Instant::now()));
    }

    /// Closes the open stage and returns its duration, or zero if none is
    /// open.
    pub fn end_stage(&mut self) -> f64 {
        let Some((stage, since)) = self.open.take() else {
            return 0.0;
        };
        let duration_ms = millis(since);
        self.timings.push(StageTiming { stage, duration_ms });
        duration_ms
    }

    /// Returns the time since the run started.
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        millis(self.started)
    }

    /// Returns the closed stage timings in order.
    #[must_use]
    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    /// Consumes the timer, returning the stage timings.
    #[must_use]
    pub fn into_timings(self) -> Vec<StageTiming> {
        self.timings
    }
}

fn millis(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
