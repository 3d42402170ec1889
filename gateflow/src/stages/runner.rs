//! External tool invocation seam.

use crate::core::StageKind;
use crate::errors::StageError;
use crate::events::ProgressSink;
use crate::store::FileStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Which tool output becomes the message of a failed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReport {
    /// Lines starting with `ERROR`, else the last lines of stderr.
    #[default]
    ErrorLines,
    /// Everything the tool wrote to stderr, in order.
    FullStderr,
}

/// One external program run on behalf of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Stage the run belongs to.
    pub stage: StageKind,
    /// Short name used to prefix progress lines.
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
    /// How a failure is summarized.
    #[serde(default)]
    pub report: FailureReport,
}

impl ToolInvocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(stage: StageKind, label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            stage,
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            report: FailureReport::default(),
        }
    }

    /// Sets how a failure is summarized.
    #[must_use]
    pub fn report(mut self, report: FailureReport) -> Self {
        self.report = report;
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Formats a progress line with this tool's prefix.
    #[must_use]
    pub fn progress_line(&self, line: &str) -> String {
        format!("[{}] {}", self.label, line)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs tool invocations against a file store.
///
/// The runner makes `files` visible to the tool as its working directory,
/// streams every output line to `progress`, and returns the files that are
/// new or changed once the tool exits successfully.
#[async_trait]
pub trait ToolRunner: Send + Sync + Debug {
    /// Runs one invocation.
    async fn run(
        &self,
        invocation: &ToolInvocation,
        files: &FileStore,
        progress: &dyn ProgressSink,
    ) -> Result<FileStore, StageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = ToolInvocation::new(StageKind::PlaceRoute, "nextpnr", "nextpnr-himbaechel")
            .arg("--json")
            .arg("top.json")
            .args(["--device", "DEV1"]);

        assert_eq!(inv.args, vec!["--json", "top.json", "--device", "DEV1"]);
        assert_eq!(inv.to_string(), "nextpnr-himbaechel --json top.json --device DEV1");
        assert_eq!(inv.progress_line("Info: placing"), "[nextpnr] Info: placing");
        assert_eq!(inv.report, FailureReport::ErrorLines);
    }

    #[test]
    fn test_report_mode_defaults_when_absent() {
        let inv: ToolInvocation = serde_json::from_str(
            r#"{"stage":"pack","label":"gowin_pack","program":"python3","args":[]}"#,
        )
        .unwrap();
        assert_eq!(inv.report, FailureReport::ErrorLines);

        let full = inv.report(FailureReport::FullStderr);
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["report"], "full-stderr");
    }
}
