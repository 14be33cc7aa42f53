//! # bf-av
//!
//! Audio processing, probing, and external tool management for the
//! bookforged splitter.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg,
//!   ffprobe, and LibationCli.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   and [`Interrupt`] support for running external processes.
//! - **Workspace management** ([`Workspace`]) -- scratch directory next to
//!   the output folder for intermediate files.
//! - **Probing** ([`FfprobeProber`]) -- duration and chapter queries.
//! - **Metadata documents** ([`MetadataDocument`]) -- ffmetadata rendering.
//! - **Action functions** ([`actions`]) -- range extraction, metadata remux,
//!   and interruptible file copy.
//! - **Backend seam** ([`MediaBackend`]) -- the trait the splitter drives,
//!   implemented for real tools by [`FfmpegBackend`].

pub mod actions;
pub mod backend;
pub mod command;
pub mod metadata;
pub mod probe;
pub mod process;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use backend::{FfmpegBackend, MediaBackend};
pub use command::{ToolCommand, ToolOutput};
pub use metadata::{MetadataChapter, MetadataDocument};
pub use probe::FfprobeProber;
pub use process::{Interrupt, LiveProcess};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::Workspace;

// Action functions
pub use actions::{copy_interruptible, extract_range, remux_with_metadata};
