//! Wire messages between host and worker.

use crate::core::{BuildParameters, ProgressEvent, StageKind};
use crate::pipeline::PipelineOutcome;
use crate::store::FileStore;
use serde::{Deserialize, Serialize};

/// A request to run one build.
///
/// Serializes as `{ "files": {...}, "topModuleName": ..., ... }` with file
/// contents as base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Initial files.
    pub files: FileStore,
    /// Parameters for the run.
    #[serde(flatten)]
    pub params: BuildParameters,
}

impl BuildRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(files: FileStore, params: BuildParameters) -> Self {
        Self { files, params }
    }

    /// Returns the build parameters.
    #[must_use]
    pub fn parameters(&self) -> &BuildParameters {
        &self.params
    }
}

/// A message from the worker to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChannelMessage {
    /// One progress line.
    Progress {
        /// Originating stage.
        stage: StageKind,
        /// The line.
        text: String,
    },
    /// The run succeeded.
    Success {
        /// The final store; the artifact is at the requested output name.
        files: FileStore,
    },
    /// The run failed.
    Error {
        /// Diagnostic naming the failing stage.
        message: String,
        /// The failing stage.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<StageKind>,
    },
}

impl ChannelMessage {
    /// Returns true for `Success` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Builds the terminal message for an outcome.
    #[must_use]
    pub fn from_outcome(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Succeeded { files, .. } => Self::Success { files },
            PipelineOutcome::Failed(err) => Self::Error {
                message: err.to_string(),
                stage: Some(err.stage),
            },
        }
    }
}

impl From<ProgressEvent> for ChannelMessage {
    fn from(event: ProgressEvent) -> Self {
        Self::Progress {
            stage: event.stage,
            text: event.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = BuildRequest::new(
            FileStore::new().with_file("top.v", "module top;"),
            BuildParameters::new("top", "out.bin")
                .with_device("DEV1")
                .with_family("FAM1")
                .with_constraint_file("top.cst"),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "files": { "top.v": "bW9kdWxlIHRvcDs=" },
                "topModuleName": "top",
                "targetDevice": "DEV1",
                "targetFamily": "FAM1",
                "constraintFileName": "top.cst",
                "outputFileName": "out.bin",
            })
        );
        let back: BuildRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_message_tags() {
        let progress = ChannelMessage::from(ProgressEvent::new(StageKind::PlaceRoute, "[nextpnr] Info: routing"));
        assert_eq!(
            serde_json::to_value(&progress).unwrap(),
            json!({ "kind": "progress", "stage": "place-route", "text": "[nextpnr] Info: routing" })
        );
        assert!(!progress.is_terminal());

        let error = ChannelMessage::Error {
            message: "boom".to_string(),
            stage: None,
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({ "kind": "error", "message": "boom" })
        );
        assert!(error.is_terminal());
    }

    #[test]
    fn test_failed_outcome_names_stage() {
        let message = ChannelMessage::from_outcome(PipelineOutcome::Failed(StageError::engine(
            StageKind::PlaceRoute,
            "ERROR: unknown device",
        )));
        match message {
            ChannelMessage::Error { message, stage } => {
                assert_eq!(stage, Some(StageKind::PlaceRoute));
                assert!(message.starts_with("place-route stage failed"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
