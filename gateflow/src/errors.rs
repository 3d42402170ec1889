//! Error types for the gateflow build pipeline.
//!
//! Stage failures carry the failing stage and the engine's own diagnostic
//! text. Channel failures mean the background worker is gone and the
//! channel has to be replaced.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for gateflow operations.
#[derive(Debug, Error)]
pub enum GateflowError {
    /// A pipeline stage failed.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// The execution channel failed.
    #[error("{0}")]
    Channel(#[from] ChannelError),

    /// A file store operation was rejected.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A build finished with a terminal error message from the worker.
    #[error("Build failed: {message}")]
    BuildFailed {
        /// The failing stage, when known.
        stage: Option<StageKind>,
        /// The diagnostic text.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// The engine ran and reported failure.
    Engine,
    /// The engine exited cleanly but did not produce the expected file.
    MissingOutput,
    /// The secondary runtime could not be prepared.
    Environment,
    /// The engine process could not be started.
    Launch,
    /// The stage input was unusable (e.g. an unsafe path in the store).
    Input,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::MissingOutput => write!(f, "missing_output"),
            Self::Environment => write!(f, "environment"),
            Self::Launch => write!(f, "launch"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Error raised when a stage fails.
///
/// `message` is passed through verbatim from the engine where one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    /// The failing stage.
    pub stage: StageKind,
    /// What kind of failure it was.
    pub kind: StageErrorKind,
    /// The diagnostic text.
    pub message: String,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: StageKind, kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// Creates an engine failure.
    #[must_use]
    pub fn engine(stage: StageKind, message: impl Into<String>) -> Self {
        Self::new(stage, StageErrorKind::Engine, message)
    }

    /// Creates a missing output failure for `path`.
    #[must_use]
    pub fn missing_output(stage: StageKind, path: &str) -> Self {
        Self::new(
            stage,
            StageErrorKind::MissingOutput,
            format!("expected output file '{path}' was not produced"),
        )
    }

    /// Creates an environment failure.
    #[must_use]
    pub fn environment(stage: StageKind, message: impl Into<String>) -> Self {
        Self::new(stage, StageErrorKind::Environment, message)
    }
}

/// Errors from the execution channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel's worker is gone; build a new channel.
    #[error("Build channel is dead; create a new channel")]
    Dead,

    /// The worker disappeared before sending a terminal message.
    #[error("Build worker terminated before the run finished")]
    WorkerLost,

    /// The worker context could not be created.
    #[error("Failed to start build worker: {0}")]
    Spawn(String),
}

/// Errors from file store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The path cannot be materialized safely.
    #[error("Invalid store path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("Failed to parse {file}: {source}")]
    Parse {
        /// The file name.
        file: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment override had an invalid value.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// The variable or key.
        key: String,
        /// The rejected value.
        value: String,
    },
}
