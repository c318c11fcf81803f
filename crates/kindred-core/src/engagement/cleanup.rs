//! Segment pruning rules.
//!
//! Two passes per person: drop segments whose end time has aged out, then
//! cap what remains, keeping the newest by end time. The tracker decides
//! *when* to run this (interval gating in `maybe_cleanup`); this module
//! only knows *what* to remove.

use chrono::{DateTime, Duration, Utc};
use kindred_types::config::CleanupConfig;
use kindred_types::engagement::ActivitySegment;

/// Totals from one cleanup sweep, logged for observability.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub persons_touched: usize,
    pub persons_removed: usize,
    pub segments_removed: usize,
    pub segments_before: usize,
    pub segments_after: usize,
}

impl CleanupStats {
    /// Whether the sweep removed anything at all.
    pub fn changed(&self) -> bool {
        self.segments_removed > 0 || self.persons_removed > 0
    }
}

/// Prune one person's segment list in place.
///
/// Returns the number of segments removed. Survivors of the age pass are
/// re-sorted ascending by `start_time` after the cap pass so the ordering
/// invariant holds regardless of which segments were dropped.
pub fn prune_segments(
    segments: &mut Vec<ActivitySegment>,
    now: DateTime<Utc>,
    config: &CleanupConfig,
) -> usize {
    let before = segments.len();
    let max_age = Duration::days(i64::from(config.max_segment_age_days));

    segments.retain(|seg| now - seg.end_time <= max_age);

    if segments.len() > config.max_segments_per_person {
        // Keep the newest by end_time, then restore chronological order.
        segments.sort_by_key(|seg| std::cmp::Reverse(seg.end_time));
        segments.truncate(config.max_segments_per_person);
        segments.sort_by_key(|seg| seg.start_time);
    }

    before - segments.len()
}
