//! Mock runners and stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::StageKind;
use crate::errors::StageError;
use crate::events::ProgressSink;
use crate::stages::{Stage, StageInput, StageResult, ToolInvocation, ToolRunner};
use crate::store::FileStore;

/// What a scripted tool does when invoked.
#[derive(Debug, Clone)]
pub struct ToolReply {
    lines: Vec<String>,
    result: Result<FileStore, String>,
}

impl ToolReply {
    /// A successful run producing `files`.
    #[must_use]
    pub fn files(files: FileStore) -> Self {
        Self {
            lines: Vec::new(),
            result: Ok(files),
        }
    }

    /// A failed run with the given diagnostic.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            lines: Vec::new(),
            result: Err(message.into()),
        }
    }

    /// Output lines streamed before the run finishes.
    #[must_use]
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }
}

/// One invocation seen by a [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Stage that issued the call.
    pub stage: StageKind,
    /// Program name.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Paths of the files made available to the tool.
    pub input_paths: Vec<String>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Program(String),
    Arg(String),
}

impl Matcher {
    fn matches(&self, invocation: &ToolInvocation) -> bool {
        match self {
            Self::Program(p) => &invocation.program == p,
            Self::Arg(a) => invocation.args.iter().any(|arg| arg == a),
        }
    }
}

/// A tool runner answering from a script instead of spawning processes.
///
/// Rules are checked in insertion order; the first match answers. An
/// invocation nothing matches fails with an engine error.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(Matcher, ToolReply)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    /// Creates a runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers invocations of `program`.
    #[must_use]
    pub fn on(mut self, program: impl Into<String>, reply: ToolReply) -> Self {
        self.rules.push((Matcher::Program(program.into()), reply));
        self
    }

    /// Answers invocations carrying `arg` among their arguments.
    #[must_use]
    pub fn on_arg(mut self, arg: impl Into<String>, reply: ToolReply) -> Self {
        self.rules.push((Matcher::Arg(arg.into()), reply));
        self
    }

    /// Returns every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the stages of every call so far, in order.
    #[must_use]
    pub fn called_stages(&self) -> Vec<StageKind> {
        self.calls.lock().iter().map(|c| c.stage).collect()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        files: &FileStore,
        progress: &dyn ProgressSink,
    ) -> Result<FileStore, StageError> {
        self.calls.lock().push(RecordedCall {
            stage: invocation.stage,
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            input_paths: files.paths().map(str::to_string).collect(),
        });

        let Some((_, reply)) = self.rules.iter().find(|(m, _)| m.matches(invocation)) else {
            return Err(StageError::engine(
                invocation.stage,
                format!("no scripted reply for '{invocation}'"),
            ));
        };

        for line in &reply.lines {
            progress.line(invocation.stage, &invocation.progress_line(line));
        }
        reply
            .result
            .clone()
            .map_err(|message| StageError::engine(invocation.stage, message))
    }
}

/// A stage with a fixed result and a call counter.
#[derive(Debug)]
pub struct StubStage {
    kind: StageKind,
    result: StageResult,
    lines: Vec<String>,
    panics: bool,
    calls: AtomicUsize,
}

impl StubStage {
    /// A stage that succeeds producing `files`.
    #[must_use]
    pub fn succeeding(kind: StageKind, files: FileStore) -> Self {
        Self {
            kind,
            result: Ok(files),
            lines: Vec::new(),
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A stage that fails with an engine error.
    #[must_use]
    pub fn failing(kind: StageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            result: Err(StageError::engine(kind, message)),
            lines: Vec::new(),
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A stage that panics when run, taking its execution context down.
    #[must_use]
    pub fn panicking(kind: StageKind) -> Self {
        Self {
            panics: true,
            ..Self::succeeding(kind, FileStore::new())
        }
    }

    /// Progress lines emitted on each run.
    #[must_use]
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for StubStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    #[allow(clippy::panic)]
    async fn run(&self, _input: &StageInput<'_>, progress: &dyn ProgressSink) -> StageResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for line in &self.lines {
            progress.line(self.kind, line);
        }
        if self.panics {
            panic!("{} stage crashed", self.kind);
        }
        self.result.clone()
    }
}
