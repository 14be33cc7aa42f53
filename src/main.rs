mod cli;

use bookforged::{config, orchestrator, signals};

use anyhow::{Context, Result};
use bf_av::tools::FFPROBE;
use bf_av::{FfmpegBackend, FfprobeProber, Interrupt, ToolRegistry};
use bf_core::{CatalogEntry, Chapter};
use bf_split::{
    part_file_name, plan, single_file_name, BatchDriver, FileTracker, ItemOutcome, SplitContext,
};
use clap::Parser;
use cli::{Cli, Commands, SplitOptions};
use orchestrator::format_hms;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "bookforged=trace,bf_split=trace,bf_av=debug".to_string()
        } else {
            "bookforged=info,bf_split=info,bf_av=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Run {
            split,
            skip_sync,
            catalog,
            books_dir,
            author,
            libation,
            keep_export,
        } => {
            let mut config = load_with_overrides(cli.config.as_deref(), &split)?;
            if books_dir.is_some() {
                config.library.books_dir = books_dir;
            }
            if author.is_some() {
                config.library.author_filter = author;
            }
            if libation.is_some() {
                config.tools.libation_path = libation;
            }
            config.output.keep_export |= keep_export;

            let opts = orchestrator::RunOptions { skip_sync, catalog };
            run_library(&config, &opts)
        }
        Commands::Split {
            file,
            split,
            title,
            author,
        } => {
            let config = load_with_overrides(cli.config.as_deref(), &split)?;
            split_file(&file, title, author, &config)
        }
        Commands::Plan { file, split_hours } => {
            let opts = SplitOptions {
                output: None,
                split_hours,
            };
            let config = load_with_overrides(cli.config.as_deref(), &opts)?;
            plan_file(&file, &config)
        }
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            probe_file(&file, json, &config)
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("bookforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load config, apply command-line overrides, and re-check the result.
fn load_with_overrides(path: Option<&Path>, split: &SplitOptions) -> Result<config::Config> {
    let mut config = config::load_config_or_default(path)?;
    if let Some(dir) = &split.output {
        config.output.dir = dir.clone();
    }
    if let Some(hours) = split.split_hours {
        config.split.limit_hours = hours;
    }
    config::validate_config(&config)?;
    Ok(config)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn run_library(config: &config::Config, opts: &orchestrator::RunOptions) -> Result<()> {
    tracing::info!("Starting bookforged");
    tracing::info!("Output folder: {}", config.output.dir.display());
    tracing::info!("Split limit: {}h", config.split.limit_hours);

    let summary = runtime()?.block_on(orchestrator::run_library(config, opts))?;

    println!("\n{summary}");
    if summary.stopped {
        println!("Stopped by user. Run again to resume.");
    } else {
        println!("Complete!");
    }

    if summary.failed > 0 {
        anyhow::bail!("{} book(s) failed", summary.failed);
    }
    Ok(())
}

fn split_file(
    file: &Path,
    title: Option<String>,
    author: Option<String>,
    config: &config::Config,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }

    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let mut entry = CatalogEntry::new(title);
    if let Some(author) = author {
        entry = entry.with_author(author);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let backend = Arc::new(FfmpegBackend::from_registry(&tools)?);

    runtime()?.block_on(async {
        let interrupt = Interrupt::new();
        let tracker = FileTracker::new();
        let stop_handler = signals::spawn_stop_handler(interrupt.clone(), tracker.clone());

        let ctx = SplitContext::new(backend, config.output.dir.clone(), config.split.limit_secs())
            .with_interrupt(interrupt)
            .with_tracker(tracker)
            .with_progress(orchestrator::progress_logger());
        let outcome = BatchDriver::new(ctx).process_item(&entry, Some(file)).await;
        stop_handler.abort();

        match outcome {
            ItemOutcome::Success => {
                println!("✓ {} written to {}", entry.title(), config.output.dir.display());
                Ok(())
            }
            ItemOutcome::Skipped => {
                println!("✓ {} is already complete", entry.title());
                Ok(())
            }
            ItemOutcome::Stopped => {
                println!("Stopped; partial output removed");
                Ok(())
            }
            ItemOutcome::Failed(reason) => anyhow::bail!("{}: {reason}", entry.title()),
        }
    })
}

/// Duration and chapters of `file`. Ctrl+C here simply ends the process.
fn probe_media(file: &Path, config: &config::Config) -> Result<(f64, Vec<Chapter>)> {
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::new(tools.require(FFPROBE)?.path.clone());
    let interrupt = Interrupt::new();
    Ok(runtime()?.block_on(async {
        (
            prober.duration(file, &interrupt).await,
            prober.chapters(file, &interrupt).await,
        )
    }))
}

fn plan_file(file: &Path, config: &config::Config) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let (duration, chapters) = probe_media(file, config)?;
    if duration <= 0.0 {
        anyhow::bail!("Could not determine duration of {:?}", file);
    }

    let limit = config.split.limit_secs();
    let plan = plan(duration, limit, &chapters);
    let title = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    println!("File: {}", file.display());
    println!("Duration: {}", format_hms(duration));
    println!("Chapters: {}", chapters.len());
    println!("Limit: {} ({}h)", format_hms(limit), config.split.limit_hours);

    if plan.is_single() {
        println!("\nNo split needed; copied whole as {}", single_file_name(&title));
        return Ok(());
    }

    println!("\nParts: {}", plan.len());
    for segment in plan.iter() {
        let inside = chapters
            .iter()
            .filter(|c| segment.contains(c.start_offset_secs))
            .count();
        println!(
            "  {}  {} - {}  ({}, {} chapter(s))",
            part_file_name(&title, segment.index),
            format_hms(segment.start_secs),
            format_hms(segment.end_secs),
            format_hms(segment.duration_secs()),
            inside
        );
    }

    Ok(())
}

fn probe_file(file: &Path, json: bool, config: &config::Config) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let (duration, chapters) = probe_media(file, config)?;

    if json {
        let doc = serde_json::json!({
            "file": file,
            "duration_secs": duration,
            "chapters": chapters,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("File: {}", file.display());
        println!("Duration: {}", format_hms(duration));
        println!("\nChapters: {}", chapters.len());
        for (i, chapter) in chapters.iter().enumerate() {
            println!(
                "  [{}] {} {}",
                i + 1,
                format_hms(chapter.start_offset_secs),
                chapter.name
            );
        }
    }

    Ok(())
}

fn check_tools(config: &config::Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Split limit: {}h", config.split.limit_hours);
    println!("  Output folder: {}", config.output.dir.display());
    println!(
        "  Books folder: {}",
        config
            .library
            .books_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(from Libation)".to_string())
    );
    if let Some(author) = &config.library.author_filter {
        println!("  Author filter: {author}");
    }
    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    Ok(())
}
