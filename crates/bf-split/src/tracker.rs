//! Lifecycle tracking of output files for the item being processed.
//!
//! Every file the engine writes is first marked in-progress, then either
//! committed once confirmed complete or released by the step that created
//! it. Scratch directories are recorded too. The tracker is the single
//! record of what must be deleted if work stops right now; once an item
//! finishes its record is cleared and its files are no longer at risk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cleanup::CleanupReport;

#[derive(Debug, Default)]
struct TrackerState {
    current_item: Option<String>,
    in_progress: HashSet<PathBuf>,
    committed: Vec<PathBuf>,
    scratch_dirs: Vec<PathBuf>,
}

/// Shared handle to the in-progress / committed file record.
///
/// Clones refer to the same record, so the signal handler can discard the
/// current item's files while the driver is mid-segment.
#[derive(Debug, Clone, Default)]
pub struct FileTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl FileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a new item, forgetting everything about the last one.
    pub fn start_item(&self, label: &str) {
        *self.state.lock() = TrackerState {
            current_item: Some(label.to_string()),
            ..TrackerState::default()
        };
    }

    /// The current item reached a terminal state; forget its files.
    pub fn finish_item(&self) {
        *self.state.lock() = TrackerState::default();
    }

    pub fn current_item(&self) -> Option<String> {
        self.state.lock().current_item.clone()
    }

    pub fn mark_in_progress(&self, path: &Path) {
        self.state.lock().in_progress.insert(path.to_path_buf());
    }

    /// Promote `path` to committed.
    pub fn commit(&self, path: &Path) {
        let mut state = self.state.lock();
        state.in_progress.remove(path);
        if !state.committed.iter().any(|p| p == path) {
            state.committed.push(path.to_path_buf());
        }
    }

    /// Record a scratch directory to remove if the item is discarded.
    pub fn track_scratch_dir(&self, dir: &Path) {
        self.state.lock().scratch_dirs.push(dir.to_path_buf());
    }

    /// Stop tracking an in-progress path without committing it.
    pub fn release(&self, path: &Path) {
        self.state.lock().in_progress.remove(path);
    }

    pub fn in_progress(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.state.lock().in_progress.iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn committed(&self) -> Vec<PathBuf> {
        self.state.lock().committed.clone()
    }

    /// Delete every in-progress file and clear the set.
    pub fn discard_in_progress(&self) -> CleanupReport {
        let paths: Vec<PathBuf> = self.state.lock().in_progress.drain().collect();
        let mut report = CleanupReport::default();
        for path in &paths {
            report.remove(path);
        }
        if !report.removed.is_empty() {
            tracing::info!("discarded {} in-progress file(s)", report.removed.len());
        }
        report
    }

    /// Delete everything written for the current item, committed or not,
    /// along with its scratch directories.
    pub fn discard_item(&self) -> CleanupReport {
        let mut report = self.discard_in_progress();
        let (committed, scratch_dirs) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.committed),
                std::mem::take(&mut state.scratch_dirs),
            )
        };
        for path in &committed {
            report.remove(path);
        }
        for dir in &scratch_dirs {
            report.remove_dir(dir);
        }
        if let Some(item) = self.current_item() {
            tracing::info!(
                "discarded {} file(s) for {item}",
                report.removed.len()
            );
        }
        report
    }
}
