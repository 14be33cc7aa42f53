//! # bf-split
//!
//! The interruptible batch splitting engine.
//!
//! - [`plan`] computes chapter-aligned, duration-bounded segments.
//! - [`FileTracker`] records in-progress vs committed outputs so cleanup
//!   after an interruption is exact.
//! - [`Materializer`] turns one segment into one finished part file.
//! - [`BatchDriver`] walks items and their segments, aggregating outcomes
//!   into a [`BatchSummary`].

pub mod cleanup;
pub mod context;
pub mod driver;
pub mod materialize;
pub mod naming;
pub mod plan;
pub mod summary;
pub mod tracker;

pub use cleanup::CleanupReport;
pub use context::{ProgressSender, SplitContext, SplitEvent};
pub use driver::{BatchDriver, BatchItem, ItemOutcome, ItemState};
pub use materialize::{Materializer, SegmentOutcome};
pub use naming::{part_file_name, sanitize_filename, single_file_name};
pub use plan::{count_segments, plan, Segment, SplitPlan, TAIL_TOLERANCE};
pub use summary::BatchSummary;
pub use tracker::FileTracker;
