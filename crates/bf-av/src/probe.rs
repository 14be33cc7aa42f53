//! FFprobe-based duration and chapter queries.
//!
//! Both queries are forgiving: any tool or parse failure is logged and
//! collapses to "no data" (`0.0` / empty list) so the caller can fall back
//! to catalog metadata or fixed-interval cuts. A stop request terminates
//! ffprobe and also yields "no data"; callers check the interrupt after.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bf_core::Chapter;
use serde::Deserialize;

use crate::command::ToolCommand;
use crate::process::Interrupt;

const PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Total duration in seconds, or `0.0` when it cannot be determined.
    pub async fn duration(&self, path: &Path, interrupt: &Interrupt) -> f64 {
        let result = match self.query(path, "-show_format", interrupt).await {
            Ok(stdout) => parse_duration_json(&stdout),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            report_failure("duration", path, &e);
            0.0
        })
    }

    /// Chapter markers in file order, or an empty list on failure.
    pub async fn chapters(&self, path: &Path, interrupt: &Interrupt) -> Vec<Chapter> {
        let result = match self.query(path, "-show_chapters", interrupt).await {
            Ok(stdout) => parse_chapters_json(&stdout),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            report_failure("chapter", path, &e);
            Vec::new()
        })
    }

    async fn query(
        &self,
        path: &Path,
        section: &str,
        interrupt: &Interrupt,
    ) -> bf_core::Result<String> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args(["-v", "quiet", "-print_format", "json", section]);
        cmd.arg(path.to_string_lossy().as_ref());
        cmd.timeout(PROBE_TIMEOUT).interruptible(interrupt);

        Ok(cmd.execute().await?.stdout)
    }
}

fn report_failure(what: &str, path: &Path, err: &bf_core::Error) {
    if err.is_cancelled() {
        tracing::debug!("{what} probe of {} stopped", path.display());
    } else {
        tracing::warn!("{what} probe failed for {}: {err}", path.display());
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FormatOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChaptersOutput {
    #[serde(default)]
    chapters: Vec<FfprobeChapter>,
}

#[derive(Debug, Deserialize)]
struct FfprobeChapter {
    start_time: Option<serde_json::Value>,
    end_time: Option<serde_json::Value>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    title: Option<String>,
}

/// ffprobe prints times as strings, but tolerate bare numbers too.
fn seconds(value: Option<&serde_json::Value>) -> Option<f64> {
    let secs: Option<f64> = match value? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    secs.filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `format.duration` from `ffprobe -show_format` JSON.
pub fn parse_duration_json(json: &str) -> bf_core::Result<f64> {
    let out: FormatOutput = serde_json::from_str(json)
        .map_err(|e| bf_core::Error::probe(format!("ffprobe JSON parse error: {e}")))?;

    let raw = out
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| bf_core::Error::probe("no format.duration in ffprobe output"))?;

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| bf_core::Error::probe(format!("unparsable duration {raw:?}")))
}

/// Parse the chapter list from `ffprobe -show_chapters` JSON.
///
/// A missing start is `0`, a missing end equals the start, and a missing
/// title becomes `"Chapter {n}"` (1-based).
pub fn parse_chapters_json(json: &str) -> bf_core::Result<Vec<Chapter>> {
    let out: ChaptersOutput = serde_json::from_str(json)
        .map_err(|e| bf_core::Error::probe(format!("ffprobe JSON parse error: {e}")))?;

    Ok(out
        .chapters
        .into_iter()
        .enumerate()
        .map(|(i, ch)| {
            let start = seconds(ch.start_time.as_ref()).unwrap_or(0.0);
            let end = seconds(ch.end_time.as_ref()).unwrap_or(start);
            let name = ch
                .tags
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Chapter {}", i + 1));
            Chapter::new(name, start, end - start)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_format() {
        let json = r#"{"format": {"filename": "a.m4b", "duration": "45296.123000"}}"#;
        let d = parse_duration_json(json).unwrap();
        assert!((d - 45296.123).abs() < 1e-9);
    }

    #[test]
    fn duration_missing_is_error() {
        assert!(parse_duration_json(r#"{"format": {}}"#).is_err());
        assert!(parse_duration_json("{}").is_err());
        assert!(parse_duration_json("not json").is_err());
        assert!(parse_duration_json(r#"{"format": {"duration": "N/A"}}"#).is_err());
    }

    #[test]
    fn chapters_with_titles_and_gaps() {
        let json = r#"{
            "chapters": [
                {"id": 0, "time_base": "1/1000", "start_time": "0.000000", "end_time": "1800.500000",
                 "tags": {"title": "Opening Credits"}},
                {"id": 1, "time_base": "1/1000", "start_time": "1800.500000", "end_time": "3600.000000",
                 "tags": {}},
                {"id": 2, "start_time": "3600.000000"}
            ]
        }"#;

        let chapters = parse_chapters_json(json).unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].name, "Opening Credits");
        assert_eq!(chapters[0].length_secs, Some(1800.5));
        assert_eq!(chapters[1].name, "Chapter 2");
        assert_eq!(chapters[1].start_offset_secs, 1800.5);
        assert_eq!(chapters[2].name, "Chapter 3");
        assert_eq!(chapters[2].length_secs, Some(0.0));
    }

    #[test]
    fn no_chapters_key_is_empty() {
        assert!(parse_chapters_json("{}").unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_binary_collapses_to_no_data() {
        let prober = FfprobeProber::new(PathBuf::from("nonexistent_ffprobe_xyz"));
        let path = Path::new("/nonexistent/book.m4b");
        let interrupt = Interrupt::new();
        assert_eq!(prober.duration(path, &interrupt).await, 0.0);
        assert!(prober.chapters(path, &interrupt).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_terminates_a_stalled_ffprobe() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("ffprobe");
        std::fs::write(&fake, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let interrupt = Interrupt::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(trigger.live().current().is_some());
            trigger.request();
        });

        let started = std::time::Instant::now();
        let prober = FfprobeProber::new(fake);
        let duration = prober.duration(Path::new("book.m4b"), &interrupt).await;

        assert_eq!(duration, 0.0);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(interrupt.live().current(), None);
    }
}
