//! Scratch space for intermediate files.
//!
//! A [`Workspace`] is a hidden temporary directory created inside the output
//! folder, so intermediates live on the same filesystem as the parts and the
//! directory itself disappears when the workspace is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = ".bookforged-";

/// Temporary directory for one item's intermediate files.
///
/// # Example
///
/// ```no_run
/// use bf_av::Workspace;
///
/// let workspace = Workspace::new_in(std::path::Path::new("iPod_Ready_Parts")).unwrap();
/// let chunk = workspace.temp_file("part-1.m4b");
/// // ... write to `chunk` ...
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a workspace inside `parent`, creating `parent` if needed.
    pub fn new_in(parent: &Path) -> bf_core::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let temp_dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| {
                bf_core::Error::tool("workspace", format!("failed to create temp dir: {e}"))
            })?;

        Ok(Self { temp_dir })
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a path for a named temporary file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
