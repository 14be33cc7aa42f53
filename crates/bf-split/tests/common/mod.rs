//! Shared fixtures for bf-split integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bf_av::{Interrupt, MediaBackend};
use bf_core::Chapter;
use bf_split::{BatchDriver, ProgressSender, SplitContext, SplitEvent};

/// In-process stand-in for ffmpeg/ffprobe.
///
/// Extract writes a small file; remux copies the extracted bytes and records
/// the metadata document it was given. Individual calls (1-based) can be made
/// to fail or to request a stop mid-call. A "sigint" call requests a stop but
/// fails like a tool killed by a terminal Ctrl+C.
#[derive(Default)]
pub struct FakeBackend {
    pub duration: f64,
    pub chapters: Vec<Chapter>,
    pub fail_extract_call: Option<usize>,
    pub stop_during_extract_call: Option<usize>,
    pub stop_during_remux_call: Option<usize>,
    pub sigint_remux_call: Option<usize>,
    pub stop_during_probe: bool,
    pub stop_during_copy: bool,
    pub stop_after_copy: bool,
    pub extract_calls: AtomicUsize,
    pub remux_calls: AtomicUsize,
    pub chapter_probes: AtomicUsize,
    pub metadata_docs: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn with_chapters(mut self, starts: &[f64]) -> Self {
        self.chapters = starts
            .iter()
            .enumerate()
            .map(|(i, &s)| Chapter::new(format!("Chapter {}", i + 1), s, 60.0))
            .collect();
        self
    }

    pub fn extracts(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn remuxes(&self) -> usize {
        self.remux_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    async fn probe_duration(&self, _path: &Path, interrupt: &Interrupt) -> f64 {
        if self.stop_during_probe {
            interrupt.request();
            return 0.0;
        }
        self.duration
    }

    async fn probe_chapters(&self, _path: &Path, _interrupt: &Interrupt) -> Vec<Chapter> {
        self.chapter_probes.fetch_add(1, Ordering::SeqCst);
        self.chapters.clone()
    }

    async fn copy(
        &self,
        source: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<u64> {
        if self.stop_during_copy {
            std::fs::write(dest, b"first chunk")?;
            interrupt.request();
            return Err(bf_core::Error::Cancelled);
        }
        let bytes = std::fs::copy(source, dest)?;
        if self.stop_after_copy {
            interrupt.request();
        }
        Ok(bytes)
    }

    async fn extract(
        &self,
        _source: &Path,
        start: f64,
        end: f64,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()> {
        let call = self.extract_calls.fetch_add(1, Ordering::SeqCst) + 1;
        std::fs::write(dest, format!("audio {start}-{end}"))?;

        if self.stop_during_extract_call == Some(call) {
            interrupt.request();
            return Err(bf_core::Error::Cancelled);
        }
        if self.fail_extract_call == Some(call) {
            return Err(bf_core::Error::tool("ffmpeg", "simulated extract failure"));
        }
        Ok(())
    }

    async fn remux(
        &self,
        audio: &Path,
        metadata: &Path,
        dest: &Path,
        interrupt: &Interrupt,
    ) -> bf_core::Result<()> {
        let call = self.remux_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.metadata_docs
            .lock()
            .unwrap()
            .push(std::fs::read_to_string(metadata)?);

        if self.stop_during_remux_call == Some(call) {
            std::fs::write(dest, b"half a file")?;
            interrupt.request();
            return Err(bf_core::Error::Cancelled);
        }
        if self.sigint_remux_call == Some(call) {
            std::fs::write(dest, b"truncated")?;
            interrupt.request();
            return Err(bf_core::Error::tool("ffmpeg", "exited with status 255"));
        }

        // A failed extract leaves no usable input, like the real tool.
        let bytes = std::fs::read(audio)
            .map_err(|e| bf_core::Error::tool("ffmpeg", format!("input missing: {e}")))?;
        std::fs::write(dest, bytes)?;
        Ok(())
    }
}

/// A driver over `backend`, writing into `out`, with events captured.
pub fn driver(
    backend: Arc<FakeBackend>,
    out: &Path,
    limit_secs: f64,
) -> (BatchDriver, Arc<Mutex<Vec<SplitEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let ctx = SplitContext::new(backend, out.to_path_buf(), limit_secs).with_progress(
        ProgressSender::new(move |e| sink.lock().unwrap().push(e.clone())),
    );
    (BatchDriver::new(ctx), events)
}

/// Write a placeholder source recording.
pub fn source_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"encoded audio bytes").unwrap();
    path
}

/// Sorted file names in `dir`, hidden entries included.
pub fn names_in(dir: &Path) -> Vec<String> {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = rd
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
