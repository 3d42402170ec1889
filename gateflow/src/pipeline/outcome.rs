//! Terminal outcome of a run.

use crate::core::StageKind;
use crate::errors::StageError;
use crate::store::FileStore;

/// How a run ended. Resolved exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// All three stages succeeded.
    Succeeded {
        /// The final store: inputs plus every stage's outputs.
        files: FileStore,
        /// Path of the finished artifact within `files`.
        output_file_name: String,
    },
    /// A stage failed; nothing produced by the run is returned.
    Failed(StageError),
}

impl PipelineOutcome {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Returns the finished artifact's bytes.
    #[must_use]
    pub fn artifact(&self) -> Option<&[u8]> {
        match self {
            Self::Succeeded {
                files,
                output_file_name,
            } => files.get(output_file_name),
            Self::Failed(_) => None,
        }
    }

    /// Returns the failing stage.
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            Self::Failed(err) => Some(err.stage),
            Self::Succeeded { .. } => None,
        }
    }

    /// Converts into the final store or the stage error.
    pub fn into_result(self) -> Result<FileStore, StageError> {
        match self {
            Self::Succeeded { files, .. } => Ok(files),
            Self::Failed(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_exposes_artifact() {
        let outcome = PipelineOutcome::Succeeded {
            files: FileStore::new().with_file("out.bin", [1u8, 2, 3]),
            output_file_name: "out.bin".to_string(),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.artifact(), Some(&[1u8, 2, 3][..]));
        assert_eq!(outcome.failed_stage(), None);
    }

    #[test]
    fn test_failure_has_no_files() {
        let outcome = PipelineOutcome::Failed(StageError::engine(StageKind::Pack, "Exit 1"));
        assert_eq!(outcome.artifact(), None);
        assert_eq!(outcome.failed_stage(), Some(StageKind::Pack));
        assert!(outcome.into_result().is_err());
    }
}
