//! Tool runner backed by real processes.
//!
//! Each invocation gets a fresh scratch directory holding the store's files.
//! Both output streams are read concurrently and forwarded line by line.

use super::runner::{FailureReport, ToolInvocation, ToolRunner};
use crate::core::StageKind;
use crate::errors::{StageError, StageErrorKind};
use crate::events::ProgressSink;
use crate::store::{validate_path, FileStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Number of trailing stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 40;

/// Runs invocations as child processes in scratch directories.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    scratch_root: Option<PathBuf>,
}

impl ProcessRunner {
    /// Creates a runner using the system temporary directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates scratch directories under `root` instead.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gateflow-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        files: &FileStore,
        progress: &dyn ProgressSink,
    ) -> Result<FileStore, StageError> {
        let stage = invocation.stage;
        let workdir = self
            .scratch_dir()
            .map_err(|e| launch_error(stage, format!("failed to create working directory: {e}")))?;

        materialize(workdir.path(), files, stage).await?;
        debug!(
            stage = %stage,
            workdir = %workdir.path().display(),
            command = %invocation,
            "Spawning tool"
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(workdir.path())
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                launch_error(stage, format!("failed to start '{}': {e}", invocation.program))
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(launch_error(stage, "tool output streams unavailable"));
        };

        let diagnostics = stream_output(invocation, stdout, stderr, progress).await;

        let status = child
            .wait()
            .await
            .map_err(|e| launch_error(stage, format!("failed to wait for '{}': {e}", invocation.program)))?;

        if !status.success() {
            warn!(stage = %stage, program = %invocation.program, %status, "Tool failed");
            return Err(StageError::engine(
                stage,
                diagnostics.message(&invocation.program, status),
            ));
        }

        let after = collect(workdir.path())
            .await
            .map_err(|e| launch_error(stage, format!("failed to read tool outputs: {e}")))?;
        Ok(after.diff_from(files))
    }
}

fn launch_error(stage: StageKind, message: impl Into<String>) -> StageError {
    StageError::new(stage, StageErrorKind::Launch, message)
}

/// Writes every store entry under `dir`.
async fn materialize(dir: &Path, files: &FileStore, stage: StageKind) -> Result<(), StageError> {
    for file in files.iter() {
        validate_path(file.path)
            .map_err(|e| StageError::new(stage, StageErrorKind::Input, e.to_string()))?;

        let target = dir.join(file.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| launch_error(stage, format!("failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&target, file.content)
            .await
            .map_err(|e| launch_error(stage, format!("failed to write {}: {e}", file.path)))?;
    }
    Ok(())
}

/// Reads every regular file under `dir` into a store keyed by relative path.
async fn collect(dir: &Path) -> std::io::Result<FileStore> {
    let mut store = FileStore::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Some(relative) = relative_path(dir, &path) {
                    store.insert(relative, tokio::fs::read(&path).await?);
                }
            }
        }
    }
    Ok(store)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Output captured for failure reports.
#[derive(Debug)]
struct Diagnostics {
    report: FailureReport,
    error_lines: Vec<String>,
    stderr: VecDeque<String>,
}

impl Diagnostics {
    fn new(report: FailureReport) -> Self {
        Self {
            report,
            error_lines: Vec::new(),
            stderr: VecDeque::new(),
        }
    }

    fn record(&mut self, line: &str, from_stderr: bool) {
        if self.report == FailureReport::ErrorLines && line.trim_start().starts_with("ERROR") {
            self.error_lines.push(line.to_string());
        }
        if from_stderr {
            if self.report == FailureReport::ErrorLines && self.stderr.len() == STDERR_TAIL_LINES {
                self.stderr.pop_front();
            }
            self.stderr.push_back(line.to_string());
        }
    }

    /// The tool's own words: its `ERROR` lines, else the captured stderr,
    /// else the exit status.
    fn message(&self, program: &str, status: ExitStatus) -> String {
        if !self.error_lines.is_empty() {
            return self.error_lines.join("\n");
        }
        if !self.stderr.is_empty() {
            return self.stderr.iter().cloned().collect::<Vec<_>>().join("\n");
        }
        format!("'{program}' exited with {status}")
    }
}

async fn stream_output<O, E>(
    invocation: &ToolInvocation,
    stdout: O,
    stderr: E,
    progress: &dyn ProgressSink,
) -> Diagnostics
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let (mut out_done, mut err_done) = (false, false);
    let mut diagnostics = Diagnostics::new(invocation.report);

    while !(out_done && err_done) {
        let (segment, from_stderr) = tokio::select! {
            segment = out.next_segment(), if !out_done => (segment, false),
            segment = err.next_segment(), if !err_done => (segment, true),
        };

        match segment {
            Ok(Some(bytes)) => {
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                diagnostics.record(line, from_stderr);
                progress.line(invocation.stage, &invocation.progress_line(line));
            }
            Ok(None) | Err(_) => {
                if from_stderr {
                    err_done = true;
                } else {
                    out_done = true;
                }
            }
        }
    }
    diagnostics
}
