//! Media-domain types shared between probing and splitting.

use serde::{Deserialize, Serialize};

/// Length assumed for a chapter whose source did not report one.
pub const DEFAULT_CHAPTER_SECS: f64 = 60.0;

/// A named chapter marker within a source recording.
///
/// Offsets are in seconds from the start of the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub start_offset_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_secs: Option<f64>,
}

impl Chapter {
    pub fn new(name: impl Into<String>, start_offset_secs: f64, length_secs: f64) -> Self {
        Self {
            name: name.into(),
            start_offset_secs,
            length_secs: Some(length_secs),
        }
    }

    /// Chapter length, falling back to [`DEFAULT_CHAPTER_SECS`].
    pub fn length_or_default(&self) -> f64 {
        self.length_secs.unwrap_or(DEFAULT_CHAPTER_SECS)
    }
}
