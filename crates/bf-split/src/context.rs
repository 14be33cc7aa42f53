//! Execution context shared by the driver and materializer for a run.

use std::path::PathBuf;
use std::sync::Arc;

use bf_av::{Interrupt, MediaBackend};

use crate::driver::{ItemOutcome, ItemState};
use crate::tracker::FileTracker;

/// Status updates emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitEvent {
    ItemStarted {
        title: String,
        position: usize,
        total: usize,
    },
    StateChanged {
        title: String,
        state: ItemState,
    },
    SegmentStarted {
        part: usize,
        parts: usize,
        start_secs: f64,
        end_secs: f64,
    },
    SegmentFinished {
        part: usize,
        parts: usize,
    },
    ItemFinished {
        title: String,
        outcome: ItemOutcome,
    },
}

/// Sender for reporting engine status to the caller.
///
/// Wraps a callback that receives each [`SplitEvent`].
pub struct ProgressSender {
    callback: Box<dyn Fn(&SplitEvent) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(&SplitEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all events.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    pub fn send(&self, event: SplitEvent) {
        (self.callback)(&event);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Everything a run needs, owned explicitly rather than held in globals.
pub struct SplitContext {
    /// Probe and stream-copy operations.
    pub backend: Arc<dyn MediaBackend>,
    /// In-progress / committed record for the current item.
    pub tracker: FileTracker,
    /// Stop request and live child handle, shared with the signal task.
    pub interrupt: Interrupt,
    /// Directory receiving finished parts.
    pub output_dir: PathBuf,
    /// Target maximum segment length in seconds.
    pub limit_secs: f64,
    /// Channel for reporting status to the caller.
    pub progress: Arc<ProgressSender>,
}

impl SplitContext {
    /// Create a new context with a fresh tracker and interrupt.
    pub fn new(backend: Arc<dyn MediaBackend>, output_dir: PathBuf, limit_secs: f64) -> Self {
        Self {
            backend,
            tracker: FileTracker::new(),
            interrupt: Interrupt::new(),
            output_dir,
            limit_secs,
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    /// Builder: share an existing tracker.
    pub fn with_tracker(mut self, tracker: FileTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Builder: share an existing interrupt.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.interrupt.is_requested()
    }
}

impl std::fmt::Debug for SplitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitContext")
            .field("output_dir", &self.output_dir)
            .field("limit_secs", &self.limit_secs)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
