//! Container remux that attaches an ffmetadata document.

use std::path::Path;

use crate::command::ToolCommand;
use crate::process::Interrupt;

use super::FFMPEG_TIMEOUT;

/// Remux `audio` into `dest`, taking global tags and chapters from the
/// ffmetadata file at `metadata`.
pub async fn remux_with_metadata(
    ffmpeg: &Path,
    audio: &Path,
    metadata: &Path,
    dest: &Path,
    interrupt: &Interrupt,
) -> bf_core::Result<()> {
    tracing::info!("remux {} -> {}", audio.display(), dest.display());

    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.args(["-y", "-i"]);
    cmd.arg(audio.to_string_lossy().as_ref());
    cmd.arg("-i");
    cmd.arg(metadata.to_string_lossy().as_ref());
    cmd.args(["-map_metadata", "1", "-map_chapters", "1", "-c", "copy"]);
    cmd.arg(dest.to_string_lossy().as_ref());
    cmd.timeout(FFMPEG_TIMEOUT);
    cmd.interruptible(interrupt);

    let output = cmd.execute().await?;
    tracing::debug!("ffmpeg remux stderr: {}", output.stderr.trim());
    Ok(())
}
