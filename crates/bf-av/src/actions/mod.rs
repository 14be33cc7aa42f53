//! Media actions: range extraction, metadata remux, and interruptible copy.

mod copy;
mod extract;
mod remux;

pub use copy::copy_interruptible;
pub use extract::extract_range;
pub use remux::remux_with_metadata;

use std::time::Duration;

/// Upper bound for a single stream-copy ffmpeg call.
pub(crate) const FFMPEG_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Format seconds for ffmpeg's `-ss` / `-to`.
pub(crate) fn timestamp(secs: f64) -> String {
    format!("{secs:.6}")
}
