//! Turning one planned segment into one finished part file.
//!
//! Steps: extract the range into a scratch file, write the segment's
//! ffmetadata document, remux both into the final output. The output is
//! committed only when every step succeeded and the file exists; scratch
//! files are removed and untracked on every exit path.

use std::path::{Path, PathBuf};

use bf_av::{MetadataChapter, MetadataDocument, Workspace};
use bf_core::{CatalogEntry, Chapter};

use crate::cleanup::{remove_all, CleanupReport};
use crate::context::SplitContext;
use crate::plan::Segment;

/// Result of materializing one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// The part was written and committed.
    Committed(PathBuf),
    /// A step failed; nothing was committed.
    Failed(String),
    /// A stop was requested; the partial output was removed.
    Stopped,
}

/// Build the ffmetadata document for `segment` of `entry`.
///
/// Only chapters starting inside the segment are listed, re-based to the
/// segment start and converted to whole milliseconds.
pub fn segment_metadata(
    entry: &CatalogEntry,
    segment: &Segment,
    chapters: &[Chapter],
) -> MetadataDocument {
    let title = entry.title();
    MetadataDocument {
        title: format!("{title} - Part {}", segment.index),
        album: title.to_string(),
        artist: entry.resolved_author().to_string(),
        chapters: chapters
            .iter()
            .filter(|ch| segment.contains(ch.start_offset_secs))
            .map(|ch| {
                let start_ms = ((ch.start_offset_secs - segment.start_secs) * 1000.0) as i64;
                let length_ms = (ch.length_or_default() * 1000.0) as i64;
                MetadataChapter {
                    start_ms: start_ms.max(0),
                    end_ms: start_ms + length_ms,
                    title: ch.name.clone(),
                }
            })
            .collect(),
    }
}

/// Drives extract, metadata and remux for segments of one item.
pub struct Materializer<'a> {
    ctx: &'a SplitContext,
    workspace: &'a Workspace,
}

impl<'a> Materializer<'a> {
    pub fn new(ctx: &'a SplitContext, workspace: &'a Workspace) -> Self {
        Self { ctx, workspace }
    }

    /// Produce `output` from `segment` of `source`.
    pub async fn materialize(
        &self,
        entry: &CatalogEntry,
        source: &Path,
        chapters: &[Chapter],
        segment: &Segment,
        output: &Path,
    ) -> SegmentOutcome {
        if self.ctx.is_stopped() {
            return SegmentOutcome::Stopped;
        }

        let temp_audio = self.workspace.temp_file(&format!("part-{}.m4b", segment.index));
        let temp_meta = self.workspace.temp_file(&format!("part-{}.ffmeta", segment.index));

        let tracker = &self.ctx.tracker;
        for path in [temp_audio.as_path(), temp_meta.as_path(), output] {
            tracker.mark_in_progress(path);
        }

        let outcome = self
            .run_steps(entry, source, chapters, segment, output, &temp_audio, &temp_meta)
            .await;

        let report = remove_all([temp_audio.as_path(), temp_meta.as_path()]);
        if !report.is_clean() {
            tracing::warn!("{} scratch file(s) could not be removed", report.failed.len());
        }
        tracker.release(&temp_audio);
        tracker.release(&temp_meta);
        tracker.release(output);

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        entry: &CatalogEntry,
        source: &Path,
        chapters: &[Chapter],
        segment: &Segment,
        output: &Path,
        temp_audio: &Path,
        temp_meta: &Path,
    ) -> SegmentOutcome {
        let backend = &self.ctx.backend;
        let interrupt = &self.ctx.interrupt;
        let mut failure: Option<String> = None;

        match backend
            .extract(source, segment.start_secs, segment.end_secs, temp_audio, interrupt)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => return self.stop(output),
            Err(e) => {
                tracing::error!("part {} extract failed: {e}", segment.index);
                failure = Some(format!("extract failed: {e}"));
            }
        }
        if self.ctx.is_stopped() {
            return self.stop(output);
        }

        let doc = segment_metadata(entry, segment, chapters);
        if let Err(e) = doc.write_to(temp_meta).await {
            tracing::error!("part {} metadata write failed: {e}", segment.index);
            return self.fail(output, format!("metadata write failed: {e}"));
        }

        match backend.remux(temp_audio, temp_meta, output, interrupt).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => return self.stop(output),
            Err(e) => {
                tracing::error!("part {} remux failed: {e}", segment.index);
                failure.get_or_insert(format!("remux failed: {e}"));
            }
        }
        if self.ctx.is_stopped() {
            return self.stop(output);
        }

        match failure {
            None if output.exists() => {
                self.ctx.tracker.commit(output);
                tracing::info!("part {} written: {}", segment.index, output.display());
                SegmentOutcome::Committed(output.to_path_buf())
            }
            None => self.fail(output, "output missing after remux".to_string()),
            Some(reason) => self.fail(output, reason),
        }
    }

    fn stop(&self, output: &Path) -> SegmentOutcome {
        let mut report = CleanupReport::default();
        report.remove(output);
        tracing::info!("stopped; partial {} removed", output.display());
        SegmentOutcome::Stopped
    }

    fn fail(&self, output: &Path, reason: String) -> SegmentOutcome {
        CleanupReport::default().remove(output);
        SegmentOutcome::Failed(reason)
    }
}
