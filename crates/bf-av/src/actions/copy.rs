//! Whole-file copy for recordings that need no splitting.

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::process::Interrupt;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Copy `source` to `dest` in chunks, checking `interrupt` between chunks.
///
/// Returns the number of bytes copied. On [`bf_core::Error::Cancelled`] or
/// any I/O error a partial `dest` may remain; removing it is the caller's
/// job since the caller tracks it.
pub async fn copy_interruptible(
    source: &Path,
    dest: &Path,
    interrupt: &Interrupt,
) -> bf_core::Result<u64> {
    tracing::info!("copy {} -> {}", source.display(), dest.display());

    let mut reader = tokio::fs::File::open(source).await?;
    let mut writer = tokio::fs::File::create(dest).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut copied: u64 = 0;

    loop {
        if interrupt.is_requested() {
            return Err(bf_core::Error::Cancelled);
        }

        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        copied += n as u64;
    }

    writer.flush().await?;
    writer.sync_all().await?;

    if let Ok(meta) = tokio::fs::metadata(source).await {
        let _ = tokio::fs::set_permissions(dest, meta.permissions()).await;
    }

    Ok(copied)
}
