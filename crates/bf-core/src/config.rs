//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized by the binary (from TOML) and
//! carries the tool, split, output and library sections. Every section
//! defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub split: SplitConfig,
    pub output: OutputConfig,
    pub library: LibraryConfig,
}

impl Config {
    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.split.limit_hours > 24.0 {
            warnings.push(format!(
                "split.limit_hours is {}; most players handle files under 24h best",
                self.split.limit_hours
            ));
        }

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
            ("tools.libation_path", &self.tools.libation_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("{name} does not exist: {}", p.display()));
                }
            }
        }

        if let Some(dir) = &self.library.books_dir {
            if !dir.is_dir() {
                warnings.push(format!(
                    "library.books_dir is not a directory: {}",
                    dir.display()
                ));
            }
        }

        if self.output.dir.as_os_str().is_empty() {
            warnings.push(
                "output.dir is empty; parts will be written to the working directory".into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Optional explicit paths for external tools; `PATH` is searched otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub libation_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Partitioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Target maximum part length in hours.
    pub limit_hours: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            limit_hours: default_limit_hours(),
        }
    }
}

impl SplitConfig {
    pub fn limit_secs(&self) -> f64 {
        self.limit_hours * 3600.0
    }
}

fn default_limit_hours() -> f64 {
    10.0
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving finished parts.
    pub dir: PathBuf,
    /// Keep the catalog export after a run instead of deleting it.
    pub keep_export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            keep_export: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("iPod_Ready_Parts")
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Books folder override; asked from Libation when unset.
    pub books_dir: Option<PathBuf>,
    /// Only process books whose author contains this text.
    pub author_filter: Option<String>,
    /// Where the catalog export is written.
    pub export_path: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            books_dir: None,
            author_filter: None,
            export_path: default_export_path(),
        }
    }
}

fn default_export_path() -> PathBuf {
    PathBuf::from("library_data.json")
}
