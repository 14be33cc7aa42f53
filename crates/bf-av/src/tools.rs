//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of external CLI
//! tools (ffmpeg, ffprobe, LibationCli) and provides lookup methods for the
//! rest of the workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Registry key for ffmpeg.
pub const FFMPEG: &str = "ffmpeg";
/// Registry key for ffprobe.
pub const FFPROBE: &str = "ffprobe";
/// Registry key for the Libation command-line client.
pub const LIBATION: &str = "libation";

/// Known tool names that the registry manages, with the executable names
/// searched on `PATH` for each.
const KNOWN_TOOLS: &[(&str, &[&str])] = &[
    (FFMPEG, &["ffmpeg"]),
    (FFPROBE, &["ffprobe"]),
    (LIBATION, &["LibationCli", "libationcli"]),
];

/// Configuration for a single external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Registry name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`bf_core::config::ToolsConfig`] supplies a
    /// custom path **and** that path exists, it is used directly.  Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`.  Tools that are
    /// not found are silently omitted from the registry.
    pub fn discover(tools_config: &bf_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &(name, executables) in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                FFPROBE => tools_config.ffprobe_path.as_deref(),
                LIBATION => tools_config.libation_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!("{name} path {} does not exist; searching PATH", p.display());
                    search_path(executables)
                }
                None => search_path(executables),
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Register a tool at an explicit path, replacing any discovered one.
    pub fn with_tool(mut self, name: &str, path: PathBuf) -> Self {
        self.tools.insert(
            name.to_string(),
            ToolConfig {
                name: name.to_string(),
                path,
            },
        );
        self
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or an
    /// [`bf_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> bf_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            bf_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&(name, _)| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, &cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

fn search_path(executables: &[&str]) -> Option<PathBuf> {
    executables.iter().find_map(|exe| which::which(exe).ok())
}

/// Run `<tool> -version` and return the first line of stdout.
///
/// LibationCli has no version flag, so it is reported without one.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    if name == LIBATION {
        return None;
    }

    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
