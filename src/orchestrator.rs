//! The `run` pipeline: sync the Libation library, export its catalog, find
//! each book's file, then split everything that is too long.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bf_av::tools::LIBATION;
use bf_av::{FfmpegBackend, Interrupt, MediaBackend, ToolRegistry};
use bf_core::catalog::parse_catalog;
use bf_core::CatalogEntry;
use bf_split::{
    BatchDriver, BatchItem, BatchSummary, FileTracker, ProgressSender, SplitContext, SplitEvent,
};

use crate::config::Config;
use crate::libation::Libation;
use crate::library::LibraryIndex;
use crate::signals;

/// Per-invocation switches that have no config-file equivalent.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip `scan` and `liberate`.
    pub skip_sync: bool,
    /// Use this export instead of asking Libation for one. It is never
    /// deleted.
    pub catalog: Option<PathBuf>,
}

/// Keep liberated books, optionally only those by a matching author.
pub fn select_books(entries: Vec<CatalogEntry>, author_filter: Option<&str>) -> Vec<CatalogEntry> {
    let author_filter = author_filter.map(str::trim).filter(|a| !a.is_empty());
    entries
        .into_iter()
        .filter(CatalogEntry::is_liberated)
        .filter(|e| author_filter.map_or(true, |a| e.matches_author(a)))
        .collect()
}

/// Books whose catalog length exceeds the split limit.
pub fn count_long_books(entries: &[CatalogEntry], limit_secs: f64) -> usize {
    entries
        .iter()
        .filter(|e| e.catalog_secs() > limit_secs)
        .count()
}

/// Pair each entry with its resolved file.
pub fn build_items(entries: Vec<CatalogEntry>, index: &LibraryIndex) -> Vec<BatchItem> {
    entries
        .into_iter()
        .map(|entry| {
            let source = index.resolve(&entry).map(Path::to_path_buf);
            if source.is_none() {
                tracing::debug!("No file found for {}", entry.title());
            }
            BatchItem { entry, source }
        })
        .collect()
}

/// Progress sink that narrates a batch through the log.
pub fn progress_logger() -> ProgressSender {
    ProgressSender::new(|event| match event {
        SplitEvent::ItemStarted {
            title,
            position,
            total,
        } => tracing::info!("[{position}/{total}] {title}"),
        SplitEvent::SegmentStarted {
            part,
            parts,
            start_secs,
            end_secs,
        } => tracing::info!(
            "  part {part}/{parts}: {} - {}",
            format_hms(*start_secs),
            format_hms(*end_secs)
        ),
        SplitEvent::SegmentFinished { part, parts } => {
            tracing::debug!("  part {part}/{parts} written")
        }
        SplitEvent::StateChanged { title, state } => tracing::trace!("{title}: {state:?}"),
        SplitEvent::ItemFinished { .. } => {}
    })
}

/// `HH:MM:SS` for a second count.
pub fn format_hms(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Absolute form of `path`, relative to the working directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Full library pipeline. Returns the batch summary; setup problems are
/// errors.
pub async fn run_library(config: &Config, opts: &RunOptions) -> Result<BatchSummary> {
    let tools = ToolRegistry::discover(&config.tools);
    let backend: Arc<dyn MediaBackend> = Arc::new(FfmpegBackend::from_registry(&tools)?);

    let interrupt = Interrupt::new();
    let tracker = FileTracker::new();
    let stop_handler = signals::spawn_stop_handler(interrupt.clone(), tracker.clone());

    let result = run_with(config, opts, &tools, backend, interrupt, tracker).await;
    stop_handler.abort();
    result
}

async fn run_with(
    config: &Config,
    opts: &RunOptions,
    tools: &ToolRegistry,
    backend: Arc<dyn MediaBackend>,
    interrupt: Interrupt,
    tracker: FileTracker,
) -> Result<BatchSummary> {
    let output_dir = &config.output.dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    // Libation is only needed when we have to sync, export or locate books.
    let needs_libation =
        opts.catalog.is_none() || config.library.books_dir.is_none() || !opts.skip_sync;
    let libation = if needs_libation {
        let exe = tools.require(LIBATION)?.path.clone();
        tracing::info!("Using LibationCli at {}", exe.display());
        Some(Libation::new(exe, interrupt.clone()))
    } else {
        None
    };

    let books_dir = match (&config.library.books_dir, &libation) {
        (Some(dir), _) => dir.clone(),
        (None, Some(cli)) => cli
            .books_dir()
            .await
            .context("Could not determine the Libation Books folder; set library.books_dir")?,
        (None, None) => anyhow::bail!("No books folder configured"),
    };
    tracing::info!("Books folder: {}", books_dir.display());

    if let (false, Some(cli)) = (opts.skip_sync, &libation) {
        if let Err(e) = cli.scan().await {
            if e.is_cancelled() {
                return Ok(stopped_before_start());
            }
            tracing::warn!("Libation scan failed: {e}");
        }
        if let Err(e) = cli.liberate().await {
            if e.is_cancelled() {
                return Ok(stopped_before_start());
            }
            tracing::warn!("Libation liberate failed: {e}");
        }
    }

    let (catalog_path, exported) = match (&opts.catalog, &libation) {
        (Some(path), _) => (path.clone(), false),
        (None, Some(cli)) => {
            let path = absolute(&config.library.export_path);
            tracing::info!("Exporting library to {}", path.display());
            if let Err(e) = cli.export_catalog(&path).await {
                if interrupt.is_requested() {
                    return Ok(stopped_before_start());
                }
                return Err(e);
            }
            (path, true)
        }
        (None, None) => anyhow::bail!("No catalog available"),
    };

    let index = LibraryIndex::scan(&books_dir);
    tracing::info!("Found {} .m4b file(s) in the books folder", index.file_count());

    let json = tokio::fs::read_to_string(&catalog_path)
        .await
        .with_context(|| format!("Failed to read catalog {:?}", catalog_path))?;
    let entries = parse_catalog(&json)?;
    let loaded = entries.len();

    let limit_secs = config.split.limit_secs();
    let books = select_books(entries, config.library.author_filter.as_deref());
    tracing::info!(
        "Loaded {loaded} book(s); {} liberated, {} longer than {}h",
        books.len(),
        count_long_books(&books, limit_secs),
        config.split.limit_hours
    );
    if let Some(author) = &config.library.author_filter {
        tracing::info!("Filtering by author: {author}");
    }

    let items = build_items(books, &index);
    let ctx = SplitContext::new(backend, output_dir.clone(), limit_secs)
        .with_interrupt(interrupt)
        .with_tracker(tracker)
        .with_progress(progress_logger());
    let summary = BatchDriver::new(ctx).run(&items).await;

    if exported && !config.output.keep_export {
        if let Err(e) = std::fs::remove_file(&catalog_path) {
            tracing::warn!("Could not remove export {}: {e}", catalog_path.display());
        }
    }

    Ok(summary)
}

fn stopped_before_start() -> BatchSummary {
    tracing::warn!("Stopped before any book was processed");
    BatchSummary {
        stopped: true,
        ..BatchSummary::default()
    }
}
