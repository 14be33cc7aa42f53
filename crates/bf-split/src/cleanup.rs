//! Best-effort file removal that attempts every path.

use std::io;
use std::path::{Path, PathBuf};

/// What a cleanup pass removed and what it could not.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Remove `path` if it exists, recording the result.
    pub fn remove(&mut self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!("removed {}", path.display());
                self.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("could not remove {}: {e}", path.display());
                self.failed.push((path.to_path_buf(), e));
            }
        }
    }

    /// Remove the directory `path` and everything in it, if it exists.
    pub fn remove_dir(&mut self, path: &Path) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => {
                tracing::debug!("removed {}", path.display());
                self.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("could not remove {}: {e}", path.display());
                self.failed.push((path.to_path_buf(), e));
            }
        }
    }
}

/// Remove every path, continuing past failures.
pub fn remove_all<'a>(paths: impl IntoIterator<Item = &'a Path>) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        report.remove(path);
    }
    report
}
