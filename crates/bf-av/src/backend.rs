//! The seam between the splitting engine and the media tools.
//!
//! [`MediaBackend`] bundles the probe and stream-copy operations the splitter
//! needs. [`FfmpegBackend`] implements it with the real CLI tools; tests
//! substitute an in-process fake.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bf_core::Chapter;

use crate::actions::{copy_interruptible, extract_range, remux_with_metadata};
use crate::probe::FfprobeProber;
use crate::process::Interrupt;
use crate::tools::{ToolRegistry, FFMPEG, FFPROBE};

/// Probe and transform operations over audio files.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Total duration in seconds; `0.0` means unknown or stopped.
    async fn probe_duration(&self, path: &Path, interrupt: &Interrupt) -> f64;

    /// Chapter list in file order; empty when unavailable or stopped.
    async fn probe_chapters(&self, path: &Path, interrupt: &Interrupt) -> Vec<Chapter>;

    /// Copy `source` to `dest` unchanged, returning the bytes written.
    ///
    /// A partial `dest` may remain on error; the caller removes it.
    async fn copy(
        &self,
        source: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<u64>;

    /// Stream-copy `[start, end)` of `source` into `dest`.
    async fn extract(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()>;

    /// Remux `audio` into `dest` with tags and chapters from `metadata`.
    async fn remux(
        &self,
        audio: &Path,
        metadata: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()>;
}

/// [`MediaBackend`] driving `ffmpeg` and `ffprobe` subprocesses.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    prober: FfprobeProber,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self {
            ffmpeg,
            prober: FfprobeProber::new(ffprobe),
        }
    }

    /// Build from discovered tools; both ffmpeg and ffprobe are required.
    pub fn from_registry(tools: &ToolRegistry) -> bf_core::Result<Self> {
        let ffmpeg = tools.require(FFMPEG)?.path.clone();
        let ffprobe = tools.require(FFPROBE)?.path.clone();
        Ok(Self::new(ffmpeg, ffprobe))
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, path: &Path, interrupt: &Interrupt) -> f64 {
        self.prober.duration(path, interrupt).await
    }

    async fn probe_chapters(&self, path: &Path, interrupt: &Interrupt) -> Vec<Chapter> {
        self.prober.chapters(path, interrupt).await
    }

    async fn copy(
        &self,
        source: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<u64> {
        copy_interruptible(source, dest, interrupt).await
    }

    async fn extract(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()> {
        extract_range(&self.ffmpeg, source, start, end, dest, interrupt).await
    }

    async fn remux(
        &self,
        audio: &Path,
        metadata: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()> {
        remux_with_metadata(&self.ffmpeg, audio, metadata, dest, interrupt).await
    }
}
