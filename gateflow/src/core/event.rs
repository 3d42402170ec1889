//! Progress events streamed while a stage runs.

use super::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single human-readable progress line tagged with its stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The stage that produced the line.
    pub stage: StageKind,
    /// The line itself.
    pub text: String,
}

impl ProgressEvent {
    /// Creates a new progress event.
    #[must_use]
    pub fn new(stage: StageKind, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.text)
    }
}
