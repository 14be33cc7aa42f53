//! Batch driver: walks catalog items and their segments.
//!
//! Each item moves `NotStarted -> Probing -> (CopyOnly | Splitting) ->
//! (Done | Failed | Stopped)`. A stop request is honored before each item,
//! before each segment, and after each delegated call; whatever the
//! interrupted item wrote is discarded through the tracker.

use std::path::{Path, PathBuf};

use bf_av::Workspace;
use bf_core::CatalogEntry;
use serde::Serialize;

use crate::context::{SplitContext, SplitEvent};
use crate::materialize::{Materializer, SegmentOutcome};
use crate::naming::{part_file_name, single_file_name};
use crate::plan::{count_segments, plan};
use crate::summary::BatchSummary;

/// Per-item processing state, reported through [`SplitEvent::StateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    NotStarted,
    Probing,
    CopyOnly,
    Splitting,
    Done,
    Failed,
    Stopped,
}

/// Terminal result for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failed(String),
    /// All expected outputs already existed.
    Skipped,
    Stopped,
}

impl ItemOutcome {
    fn state(&self) -> ItemState {
        match self {
            ItemOutcome::Success | ItemOutcome::Skipped => ItemState::Done,
            ItemOutcome::Failed(_) => ItemState::Failed,
            ItemOutcome::Stopped => ItemState::Stopped,
        }
    }
}

/// A catalog entry paired with its resolved source file, if any.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub entry: CatalogEntry,
    pub source: Option<PathBuf>,
}

/// Runs items one at a time through probing, planning and materializing.
#[derive(Debug)]
pub struct BatchDriver {
    ctx: SplitContext,
}

impl BatchDriver {
    pub fn new(ctx: SplitContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SplitContext {
        &self.ctx
    }

    /// Process every item in order, stopping early on a stop request.
    pub async fn run(&self, items: &[BatchItem]) -> BatchSummary {
        let mut summary = BatchSummary::new(items.len());

        for (i, item) in items.iter().enumerate() {
            if self.ctx.is_stopped() {
                tracing::info!("stop requested; {} item(s) left", items.len() - i);
                summary.stopped = true;
                break;
            }

            self.ctx.progress.send(SplitEvent::ItemStarted {
                title: item.entry.title().to_string(),
                position: i + 1,
                total: items.len(),
            });

            let outcome = self.process_item(&item.entry, item.source.as_deref()).await;
            summary.record(item.entry.title(), &outcome);

            if outcome == ItemOutcome::Stopped {
                break;
            }
        }

        summary
    }

    /// Process one item and report its terminal state.
    pub async fn process_item(&self, entry: &CatalogEntry, source: Option<&Path>) -> ItemOutcome {
        let title = entry.title();
        self.ctx.tracker.start_item(title);
        self.set_state(title, ItemState::NotStarted);

        let outcome = self.process(entry, source).await;
        self.ctx.tracker.finish_item();

        match &outcome {
            ItemOutcome::Success => tracing::info!("{title}: done"),
            ItemOutcome::Skipped => tracing::info!("{title}: already complete, skipped"),
            ItemOutcome::Failed(reason) => tracing::error!("{title}: failed: {reason}"),
            ItemOutcome::Stopped => tracing::warn!("{title}: stopped"),
        }
        self.set_state(title, outcome.state());
        self.ctx.progress.send(SplitEvent::ItemFinished {
            title: title.to_string(),
            outcome: outcome.clone(),
        });

        outcome
    }

    async fn process(&self, entry: &CatalogEntry, source: Option<&Path>) -> ItemOutcome {
        let title = entry.title();

        let source = match source {
            Some(p) if p.is_file() => p,
            Some(p) => return ItemOutcome::Failed(format!("source file missing: {}", p.display())),
            None => return ItemOutcome::Failed("no matching source file".to_string()),
        };

        self.set_state(title, ItemState::Probing);
        let mut duration = self
            .ctx
            .backend
            .probe_duration(source, &self.ctx.interrupt)
            .await;
        if self.ctx.is_stopped() {
            return ItemOutcome::Stopped;
        }
        if duration <= 0.0 {
            duration = entry.catalog_secs();
            tracing::info!("{title}: probe gave no duration; using catalog length {duration:.0}s");
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.ctx.output_dir).await {
            return ItemOutcome::Failed(format!(
                "cannot create {}: {e}",
                self.ctx.output_dir.display()
            ));
        }

        if count_segments(duration, self.ctx.limit_secs) == 1 {
            self.set_state(title, ItemState::CopyOnly);
            self.copy_whole(title, source).await
        } else {
            self.set_state(title, ItemState::Splitting);
            self.split(entry, source, duration).await
        }
    }

    async fn copy_whole(&self, title: &str, source: &Path) -> ItemOutcome {
        let output = self.ctx.output_dir.join(single_file_name(title));
        if output.exists() {
            return ItemOutcome::Skipped;
        }

        let tracker = &self.ctx.tracker;
        tracker.mark_in_progress(&output);

        match self.ctx.backend.copy(source, &output, &self.ctx.interrupt).await {
            Ok(bytes) if !self.ctx.is_stopped() => {
                tracker.commit(&output);
                tracing::info!("{title}: copied {bytes} bytes to {}", output.display());
                ItemOutcome::Success
            }
            Ok(_) => {
                tracker.discard_in_progress();
                ItemOutcome::Stopped
            }
            Err(e) if e.is_cancelled() => {
                tracker.discard_in_progress();
                ItemOutcome::Stopped
            }
            Err(e) => {
                tracker.discard_in_progress();
                ItemOutcome::Failed(format!("copy failed: {e}"))
            }
        }
    }

    fn all_parts_exist(&self, title: &str, parts: usize) -> bool {
        (1..=parts).all(|n| self.ctx.output_dir.join(part_file_name(title, n)).exists())
    }

    async fn split(&self, entry: &CatalogEntry, source: &Path, duration: f64) -> ItemOutcome {
        let title = entry.title();
        let limit = self.ctx.limit_secs;

        let expected = count_segments(duration, limit);
        if self.all_parts_exist(title, expected) {
            return ItemOutcome::Skipped;
        }

        let chapters = self
            .ctx
            .backend
            .probe_chapters(source, &self.ctx.interrupt)
            .await;
        if self.ctx.is_stopped() {
            return ItemOutcome::Stopped;
        }

        let plan = plan(duration, limit, &chapters);
        // Chapter-aligned cuts can change the count; recheck against the real plan.
        if plan.len() != expected && self.all_parts_exist(title, plan.len()) {
            return ItemOutcome::Skipped;
        }
        tracing::info!(
            "{title}: {:.1}h in {} part(s), {} chapter(s)",
            duration / 3600.0,
            plan.len(),
            chapters.len()
        );

        let workspace = match Workspace::new_in(&self.ctx.output_dir) {
            Ok(ws) => ws,
            Err(e) => return ItemOutcome::Failed(e.to_string()),
        };
        self.ctx.tracker.track_scratch_dir(workspace.temp_dir());
        let materializer = Materializer::new(&self.ctx, &workspace);
        let mut failures = Vec::new();

        for segment in plan.iter() {
            if self.ctx.is_stopped() {
                self.ctx.tracker.discard_item();
                return ItemOutcome::Stopped;
            }

            self.ctx.progress.send(SplitEvent::SegmentStarted {
                part: segment.index,
                parts: plan.len(),
                start_secs: segment.start_secs,
                end_secs: segment.end_secs,
            });

            let output = self.ctx.output_dir.join(part_file_name(title, segment.index));
            match materializer
                .materialize(entry, source, &chapters, segment, &output)
                .await
            {
                SegmentOutcome::Committed(_) => {
                    self.ctx.progress.send(SplitEvent::SegmentFinished {
                        part: segment.index,
                        parts: plan.len(),
                    });
                }
                SegmentOutcome::Failed(reason) => {
                    tracing::warn!("{title}: part {} failed: {reason}", segment.index);
                    failures.push(format!("part {}: {reason}", segment.index));
                }
                SegmentOutcome::Stopped => {
                    self.ctx.tracker.discard_item();
                    return ItemOutcome::Stopped;
                }
            }
        }

        // A terminal Ctrl+C can fail the last tool call before the stop lands.
        if self.ctx.is_stopped() {
            self.ctx.tracker.discard_item();
            return ItemOutcome::Stopped;
        }
        if !failures.is_empty() {
            self.ctx.tracker.discard_item();
            return ItemOutcome::Failed(failures.join("; "));
        }

        ItemOutcome::Success
    }

    fn set_state(&self, title: &str, state: ItemState) {
        tracing::debug!("{title}: {state:?}");
        self.ctx.progress.send(SplitEvent::StateChanged {
            title: title.to_string(),
            state,
        });
    }
}
