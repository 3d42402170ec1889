//! Background worker and the host-side channel handle.

use super::message::{BuildRequest, ChannelMessage};
use crate::core::{ProgressEvent, StageKind};
use crate::errors::{ChannelError, GateflowError};
use crate::events::ProgressSink;
use crate::pipeline::PipelineCoordinator;
use crate::stages::StageSet;
use crate::store::FileStore;
use futures::Stream;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

const WORKER_THREAD_NAME: &str = "gateflow-worker";

enum Command {
    Run {
        request: BuildRequest,
        replies: UnboundedSender<ChannelMessage>,
    },
    Shutdown,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run { request, .. } => f
                .debug_struct("Run")
                .field("top", &request.params.top_module_name)
                .field("files", &request.files.len())
                .finish(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Forwards progress to the host as channel messages.
struct ChannelProgressSink {
    replies: UnboundedSender<ChannelMessage>,
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        // The host may have dropped its run handle; the build still finishes.
        let _ = self.replies.send(event.into());
    }
}

/// Handle to one background build worker.
///
/// The worker is a dedicated thread with its own single-threaded runtime.
/// [`start`](Self::start) borrows the channel mutably for the lifetime of
/// the returned [`BuildRun`], so at most one run is in flight per channel.
/// If the worker dies the channel is dead for good; create a new one.
#[derive(Debug)]
pub struct BuildChannel {
    commands: Option<crossbeam_channel::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    dead: bool,
}

impl BuildChannel {
    /// Spawns a worker that runs builds with `stages`.
    pub fn spawn(stages: StageSet) -> Result<Self, ChannelError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ChannelError::Spawn(e.to_string()))?;
        let (commands, inbox) = crossbeam_channel::unbounded();

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Build worker started");
                while let Ok(command) = inbox.recv() {
                    match command {
                        Command::Run { request, replies } => {
                            runtime.block_on(run_build(&stages, request, replies));
                        }
                        Command::Shutdown => break,
                    }
                }
                debug!("Build worker stopped");
            })
            .map_err(|e| ChannelError::Spawn(e.to_string()))?;

        Ok(Self {
            commands: Some(commands),
            worker: Some(worker),
            dead: false,
        })
    }

    /// Returns true once the worker is known to be gone.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
            || self.commands.is_none()
            || self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Starts a build.
    ///
    /// Fails with [`ChannelError::Dead`] if the worker is gone.
    pub fn start(&mut self, request: BuildRequest) -> Result<BuildRun<'_>, ChannelError> {
        if self.is_dead() {
            self.dead = true;
            return Err(ChannelError::Dead);
        }
        let Some(commands) = &self.commands else {
            return Err(ChannelError::Dead);
        };

        let (replies, receiver) = mpsc::unbounded_channel();
        info!(
            top = %request.params.top_module_name,
            files = request.files.len(),
            "Submitting build"
        );
        if commands.send(Command::Run { request, replies }).is_err() {
            self.dead = true;
            return Err(ChannelError::Dead);
        }

        Ok(BuildRun {
            channel: self,
            replies: receiver,
            finished: false,
        })
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// Returns [`ChannelError::WorkerLost`] if the worker had crashed.
    pub fn dispose(mut self) -> Result<(), ChannelError> {
        match self.shutdown() {
            Some(worker) => worker.join().map_err(|_| ChannelError::WorkerLost),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Shutdown);
        }
        self.dead = true;
        self.worker.take()
    }

    fn mark_dead(&mut self) {
        warn!("Build worker lost; channel is now dead");
        self.dead = true;
    }
}

impl Drop for BuildChannel {
    fn drop(&mut self) {
        // Detach rather than join: an in-flight build finishes on its own.
        let _ = self.shutdown();
    }
}

async fn run_build(stages: &StageSet, request: BuildRequest, replies: UnboundedSender<ChannelMessage>) {
    let sink = ChannelProgressSink {
        replies: replies.clone(),
    };
    let report = PipelineCoordinator::new(stages.clone())
        .run(request.files, request.params, &sink)
        .await;
    debug!(run_id = %report.run_id, state = %report.final_state(), "Build finished");
    let _ = replies.send(ChannelMessage::from_outcome(report.outcome));
}

/// One in-flight build on a [`BuildChannel`].
#[derive(Debug)]
pub struct BuildRun<'a> {
    channel: &'a mut BuildChannel,
    replies: UnboundedReceiver<ChannelMessage>,
    finished: bool,
}

impl<'a> BuildRun<'a> {
    /// Returns the next message, or `None` after the terminal one.
    ///
    /// If the worker disappears before sending a terminal message, the
    /// channel is marked dead and [`ChannelError::WorkerLost`] is returned.
    pub async fn next(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        if self.finished {
            return Ok(None);
        }
        let message = self.replies.recv().await;
        self.accept(message)
    }

    /// Blocking form of [`next`](Self::next) for hosts without a runtime.
    ///
    /// Must not be called from within an async context.
    pub fn next_blocking(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        if self.finished {
            return Ok(None);
        }
        let message = self.replies.blocking_recv();
        self.accept(message)
    }

    fn accept(&mut self, message: Option<ChannelMessage>) -> Result<Option<ChannelMessage>, ChannelError> {
        match message {
            Some(message) => {
                self.finished = message.is_terminal();
                Ok(Some(message))
            }
            None => {
                self.finished = true;
                self.channel.mark_dead();
                Err(ChannelError::WorkerLost)
            }
        }
    }

    /// Drives the run to its end, passing each progress line to
    /// `on_progress`.
    pub async fn wait<F>(mut self, mut on_progress: F) -> Result<FileStore, GateflowError>
    where
        F: FnMut(StageKind, &str),
    {
        while let Some(message) = self.next().await? {
            match message {
                ChannelMessage::Progress { stage, text } => on_progress(stage, &text),
                ChannelMessage::Success { files } => return Ok(files),
                ChannelMessage::Error { message, stage } => {
                    return Err(GateflowError::BuildFailed { stage, message });
                }
            }
        }
        Err(ChannelError::WorkerLost.into())
    }

    /// Converts the run into a stream of messages ending after the terminal
    /// one.
    pub fn into_stream(self) -> impl Stream<Item = Result<ChannelMessage, ChannelError>> + 'a {
        futures::stream::unfold(Some(self), |run| async move {
            let mut run = run?;
            match run.next().await {
                Ok(Some(message)) => Some((Ok(message), Some(run))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}
