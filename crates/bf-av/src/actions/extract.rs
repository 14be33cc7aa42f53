//! Lossless extraction of a time range from a source recording.

use std::path::Path;

use crate::command::ToolCommand;
use crate::process::Interrupt;

use super::{timestamp, FFMPEG_TIMEOUT};

/// Copy `[start, end)` seconds of `source` into `dest` without re-encoding.
///
/// Source chapters are dropped (`-map_chapters -1`); the remux step writes
/// the re-based chapter list.
pub async fn extract_range(
    ffmpeg: &Path,
    source: &Path,
    start: f64,
    end: f64,
    dest: &Path,
    interrupt: &Interrupt,
) -> bf_core::Result<()> {
    tracing::info!(
        "extract {} [{start:.1}s, {end:.1}s) -> {}",
        source.display(),
        dest.display()
    );

    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.args(["-y", "-ss"]);
    cmd.arg(timestamp(start));
    cmd.arg("-to");
    cmd.arg(timestamp(end));
    cmd.arg("-i");
    cmd.arg(source.to_string_lossy().as_ref());
    cmd.args(["-map_chapters", "-1", "-c", "copy", "-movflags", "+faststart"]);
    cmd.arg(dest.to_string_lossy().as_ref());
    cmd.timeout(FFMPEG_TIMEOUT);
    cmd.interruptible(interrupt);

    let output = cmd.execute().await?;
    tracing::debug!("ffmpeg extract stderr: {}", output.stderr.trim());
    Ok(())
}
