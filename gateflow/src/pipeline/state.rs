//! Run state machine.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// State of one pipeline run.
///
/// `Idle → Synthesizing → PlacingRouting → Packing → Succeeded`, with
/// `Failed` reachable from each running state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started.
    #[default]
    Idle,
    /// Running synthesis.
    Synthesizing,
    /// Running place-and-route.
    PlacingRouting,
    /// Running pack.
    Packing,
    /// Finished with an artifact.
    Succeeded,
    /// Stopped at a failed stage.
    Failed,
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid pipeline transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Current state.
    pub from: PipelineState,
    /// Requested state.
    pub to: PipelineState,
}

impl PipelineState {
    /// Returns the running state for `stage`.
    #[must_use]
    pub fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Synthesis => Self::Synthesizing,
            StageKind::PlaceRoute => Self::PlacingRouting,
            StageKind::Pack => Self::Packing,
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if `next` may follow this state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Synthesizing)
                | (Self::Synthesizing, Self::PlacingRouting)
                | (Self::PlacingRouting, Self::Packing)
                | (Self::Packing, Self::Succeeded)
                | (Self::Synthesizing | Self::PlacingRouting | Self::Packing, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting transitions outside the linear flow.
    pub fn transition(&mut self, next: Self) -> Result<(), InvalidTransition> {
        if !self.can_transition_to(next) {
            return Err(InvalidTransition { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Synthesizing => write!(f, "synthesizing"),
            Self::PlacingRouting => write!(f, "placing_routing"),
            Self::Packing => write!(f, "packing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
