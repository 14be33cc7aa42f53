//! Chapter-aligned partitioning of a recording into bounded segments.
//!
//! Cuts land on the chapter start nearest to each `pos + limit` target, and
//! a remainder shorter than `limit * TAIL_TOLERANCE` is merged into the last
//! segment instead of becoming a sliver of its own.

use bf_core::Chapter;
use serde::Serialize;

/// A segment may run this much past the limit before a cut is forced, and a
/// tail shorter than `limit * TAIL_TOLERANCE` is never split off.
pub const TAIL_TOLERANCE: f64 = 1.1;

/// One contiguous time range of the source, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// 1-based position in the plan; becomes the "Part N" number.
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl Segment {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether a chapter starting at `offset` belongs to this segment.
    pub fn contains(&self, offset: f64) -> bool {
        offset >= self.start_secs && offset < self.end_secs
    }
}

/// The ordered segments covering `[0, total)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitPlan {
    pub total_secs: f64,
    pub limit_secs: f64,
    pub segments: Vec<Segment>,
}

impl SplitPlan {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A single whole-item segment: the source is copied, not split.
    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }
}

fn fits_whole(total: f64, limit: f64) -> bool {
    !(limit.is_finite() && limit > 0.0) || total <= limit * TAIL_TOLERANCE
}

/// The chapter start closest to `target`. Ties go to the earlier chapter in
/// list order.
fn nearest_chapter_start(chapters: &[Chapter], target: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for ch in chapters {
        let distance = (ch.start_offset_secs - target).abs();
        if distance.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((ch.start_offset_secs, distance));
        }
    }
    best.map(|(start, _)| start)
}

/// Compute the split plan for a recording of `total` seconds.
///
/// With no chapters, cuts fall every `limit` seconds. A chapter cut that
/// would not advance past the current position, or would make the segment
/// longer than `limit * TAIL_TOLERANCE`, is replaced by the plain
/// `pos + limit` cut.
pub fn plan(total: f64, limit: f64, chapters: &[Chapter]) -> SplitPlan {
    let mut segments = Vec::new();

    if fits_whole(total, limit) {
        segments.push(Segment {
            index: 1,
            start_secs: 0.0,
            end_secs: total,
        });
        return SplitPlan {
            total_secs: total,
            limit_secs: limit,
            segments,
        };
    }

    let max_len = limit * TAIL_TOLERANCE;
    let mut pos = 0.0;

    while pos < total {
        let target = pos + limit;
        let end = if total - pos < max_len {
            total
        } else {
            match nearest_chapter_start(chapters, target) {
                Some(cut) if cut > pos && cut - pos <= max_len => cut,
                _ => target,
            }
        };

        segments.push(Segment {
            index: segments.len() + 1,
            start_secs: pos,
            end_secs: end,
        });
        pos = end;
    }

    SplitPlan {
        total_secs: total,
        limit_secs: limit,
        segments,
    }
}

/// Number of segments [`plan`] produces for `total` and `limit` when no
/// chapter data is available.
///
/// Used for skip detection before chapters are probed.
pub fn count_segments(total: f64, limit: f64) -> usize {
    if fits_whole(total, limit) {
        return 1;
    }

    let max_len = limit * TAIL_TOLERANCE;
    let mut pos = 0.0;
    let mut parts = 0;
    while pos < total {
        parts += 1;
        if total - pos < max_len {
            break;
        }
        pos += limit;
    }
    parts.max(1)
}
