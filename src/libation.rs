//! LibationCli glue: library sync, download, settings and catalog export.
//!
//! Every call goes through [`ToolCommand`] with the run's [`Interrupt`], so a
//! stop request terminates a long `liberate` the same way it terminates
//! ffmpeg.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use bf_av::{Interrupt, ToolCommand, ToolOutput};
use regex::Regex;

/// `scan` and `liberate` talk to Audible and may download gigabytes.
const SYNC_TIMEOUT: Duration = Duration::from_secs(12 * 3600);
const QUERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Handle on a LibationCli executable.
#[derive(Debug, Clone)]
pub struct Libation {
    exe: PathBuf,
    interrupt: Interrupt,
}

impl Libation {
    pub fn new(exe: PathBuf, interrupt: Interrupt) -> Self {
        Self { exe, interrupt }
    }

    fn command(&self, args: &[&str], timeout: Duration) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.exe.clone());
        cmd.args(args.iter().copied())
            .timeout(timeout)
            .interruptible(&self.interrupt);
        cmd
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> bf_core::Result<ToolOutput> {
        let output = self.command(args, timeout).execute().await?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("libation: {line}");
        }
        Ok(output)
    }

    /// Refresh the library from Audible.
    pub async fn scan(&self) -> bf_core::Result<()> {
        tracing::info!("Scanning Libation library");
        self.run(&["scan"], SYNC_TIMEOUT).await.map(|_| ())
    }

    /// Download and decrypt every book not yet liberated.
    pub async fn liberate(&self) -> bf_core::Result<()> {
        tracing::info!("Liberating new books");
        self.run(&["liberate"], SYNC_TIMEOUT).await.map(|_| ())
    }

    /// Ask Libation where it keeps downloaded books.
    pub async fn books_dir(&self) -> Option<PathBuf> {
        match self.run(&["get-setting", "Books", "-b"], QUERY_TIMEOUT).await {
            Ok(output) => parse_books_setting(&output.stdout),
            Err(e) => {
                tracing::warn!("Could not read Libation Books setting: {e}");
                None
            }
        }
    }

    /// Export the catalog as JSON to `dest`.
    ///
    /// Any existing file at `dest` is removed first so a stale export is
    /// never mistaken for a fresh one. Candidate syntaxes are tried in order
    /// until one leaves a non-empty file behind.
    pub async fn export_catalog(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            std::fs::remove_file(dest)
                .with_context(|| format!("Failed to remove stale export {:?}", dest))?;
        }

        let dest_str = dest.to_string_lossy();
        for (i, args) in export_candidates(&dest_str).iter().enumerate() {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            tracing::info!("Trying export syntax #{}: {}", i + 1, args.join(" "));

            match self.run(&args, QUERY_TIMEOUT).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => tracing::debug!("export syntax #{} failed: {e}", i + 1),
            }

            if is_non_empty_file(dest) {
                tracing::info!("Catalog exported with syntax #{}", i + 1);
                return Ok(());
            }
        }

        self.log_export_help().await;
        anyhow::bail!("LibationCli could not export the library to {:?}", dest)
    }

    async fn log_export_help(&self) {
        match self.run(&["export", "--help"], QUERY_TIMEOUT).await {
            Ok(output) => {
                tracing::warn!("LibationCli export help:\n{}{}", output.stdout, output.stderr)
            }
            Err(e) => tracing::warn!("LibationCli export --help failed: {e}"),
        }
    }
}

/// Export invocations, most common syntax first; Libation versions differ.
pub fn export_candidates(dest: &str) -> Vec<Vec<String>> {
    let sets: [&[&str]; 5] = [
        &["export", "--json", "-p", dest],
        &[
            "export",
            "--json",
            "-f",
            "--include-files",
            "--include-chapters",
            "-p",
            dest,
        ],
        &["export", "Audible", "--json", "-p", dest],
        &["export", "--json", "--include-files", "--include-chapters", dest],
        &["export", "-p", dest],
    ];
    sets.iter()
        .map(|set| set.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn books_setting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Books="(.*)""#).expect("valid regex"))
}

fn strip_long_path_prefix(raw: &str) -> String {
    raw.replace(r"\\?\", "").replace(r"\?\", "")
}

/// Parse `get-setting Books -b` output.
///
/// Accepts `Books="<path>"` (Windows long-path prefixes and trailing
/// backslashes stripped) or, failing that, output that is itself an
/// existing directory.
pub fn parse_books_setting(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if let Some(caps) = books_setting_re().captures(raw) {
        let path = strip_long_path_prefix(&caps[1]);
        return Some(PathBuf::from(path.trim_end_matches('\\')));
    }

    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(strip_long_path_prefix(raw));
    path.is_dir().then_some(path)
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}
