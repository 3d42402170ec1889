//! Progress sink trait and implementations.

use crate::core::{ProgressEvent, StageKind};
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Receiver of progress lines.
///
/// Emission is synchronous so that lines keep their order relative to each
/// other and to whatever the caller sends afterwards. Implementations must
/// not block for long and must never panic.
pub trait ProgressSink: Send + Sync {
    /// Emits one progress event.
    fn emit(&self, event: ProgressEvent);

    /// Emits a line for `stage`.
    fn line(&self, stage: StageKind, text: &str) {
        self.emit(ProgressEvent::new(stage, text));
    }
}

/// A sink that discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// A sink that mirrors progress into `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ProgressSink for LoggingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if self.level == Level::DEBUG {
            debug!(stage = %event.stage, "{}", event.text);
        } else {
            info!(stage = %event.stage, "{}", event.text);
        }
    }
}

/// A sink that stores every event, for tests and batch hosts.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: RwLock<Vec<ProgressEvent>>,
}

impl CollectingProgressSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the collected lines for one stage.
    #[must_use]
    pub fn lines_for(&self, stage: StageKind) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| e.stage == stage)
            .map(|e| e.text.clone())
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl ProgressSink for CollectingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }
}
