//! Engagement window tracker.
//!
//! Maintains, per conversational partner, an ordered run of activity
//! segments summarizing recent bursts of messages, and fires a one-shot
//! impression rebuild once the accumulated message count crosses the
//! engagement threshold. State survives restarts through the snapshot
//! store and is updated best-effort: a failed save is logged and the
//! in-memory state stays authoritative.
//!
//! Per-person calls arrive serialized from the upstream message pump, so
//! individual segment lists need no locking of their own; the shard locks
//! of the person map cover concurrent activity across different people.
//! No lock is ever held across a message-log await.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use kindred_types::config::{CleanupConfig, EngagementConfig, KindredConfig};
use kindred_types::engagement::{ActivitySegment, EngagementSnapshot, PersonId, StreamId};
use kindred_types::error::MessageLogError;

use crate::engagement::cleanup::{prune_segments, CleanupStats};
use crate::engagement::snapshot::SnapshotStore;
use crate::impression::ImpressionSink;
use crate::message_log::MessageLog;

use std::fmt::Write as _;
use std::time::Duration as StdDuration;

/// Upper bound on one snapshot save. A wedged disk must not stall the
/// message path; past this the save is abandoned and logged.
const SAVE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Scalar state shared with the snapshot.
#[derive(Debug, Default, Clone, Copy)]
struct Watermarks {
    last_processed_message_time: Option<DateTime<Utc>>,
    last_cleanup_time: Option<DateTime<Utc>>,
}

/// Per-stream engagement tracker.
///
/// Generic over its collaborators (message log, snapshot store, impression
/// sink) so the core stays unit-testable with fakes and never depends on
/// kindred-infra.
pub struct EngagementTracker<L, S, I> {
    stream: StreamId,
    config: EngagementConfig,
    cleanup: CleanupConfig,
    log: L,
    snapshots: S,
    impressions: I,
    persons: DashMap<PersonId, Vec<ActivitySegment>>,
    watermarks: Mutex<Watermarks>,
}

impl<L, S, I> EngagementTracker<L, S, I>
where
    L: MessageLog,
    S: SnapshotStore,
    I: ImpressionSink,
{
    /// Create an empty tracker for one conversation stream.
    ///
    /// Call [`restore`](Self::restore) afterwards to pick up persisted
    /// state from a previous run.
    pub fn new(stream: StreamId, config: KindredConfig, log: L, snapshots: S, impressions: I) -> Self {
        Self {
            stream,
            config: config.engagement,
            cleanup: config.cleanup,
            log,
            snapshots,
            impressions,
            persons: DashMap::new(),
            watermarks: Mutex::new(Watermarks::default()),
        }
    }

    /// Replace in-memory state with the persisted snapshot for this stream.
    pub async fn restore(&self) {
        let snapshot = self.snapshots.load(&self.stream).await;

        self.persons.clear();
        for (person, segments) in snapshot.persons {
            self.persons.insert(person, segments);
        }

        let mut wm = self.watermarks.lock().await;
        wm.last_processed_message_time = snapshot.last_processed_message_time;
        wm.last_cleanup_time = snapshot.last_cleanup_time;

        info!(
            stream = %self.stream,
            persons = self.persons.len(),
            "restored engagement state"
        );
    }

    /// Fold one inbound message into the person's segment run.
    ///
    /// Messages for one person must arrive in non-decreasing time order
    /// (guaranteed by the upstream per-stream pump). A small gap extends
    /// the tail segment; a gap of more than `gap_tolerance` messages
    /// closes it and opens a fresh segment anchored at `message_time`.
    pub async fn record_activity(
        &self,
        person: &PersonId,
        message_time: DateTime<Utc>,
    ) -> Result<(), MessageLogError> {
        // Read the tail before any await; per-person serialization means it
        // cannot change underneath us.
        let tail = self
            .persons
            .get(person)
            .and_then(|segments| segments.last().cloned());

        match tail {
            None => {
                let segment = self.open_segment(message_time).await?;
                info!(
                    person = %person,
                    start = %segment.start_time,
                    end = %segment.end_time,
                    count = segment.message_count,
                    "first sighting, opened engagement segment"
                );
                self.persons.entry(person.clone()).or_default().push(segment);
            }
            Some(last) => {
                let gap = self
                    .log
                    .count_between(last.last_message_time, message_time)
                    .await?;

                if gap <= self.config.gap_tolerance {
                    let count = self
                        .log
                        .count_inclusive(last.start_time, message_time)
                        .await?;
                    if let Some(mut segments) = self.persons.get_mut(person) {
                        if let Some(tail) = segments.last_mut() {
                            tail.end_time = message_time;
                            tail.last_message_time = message_time;
                            tail.message_count = count;
                            debug!(person = %person, count, "extended engagement segment");
                        }
                    }
                } else {
                    let (closed_end, closed_count) = self.close_segment(&last).await?;
                    let fresh = self.open_segment(message_time).await?;
                    if let Some(mut segments) = self.persons.get_mut(person) {
                        if let Some(tail) = segments.last_mut() {
                            tail.end_time = closed_end;
                            tail.message_count = closed_count;
                        }
                        segments.push(fresh.clone());
                    }
                    info!(
                        person = %person,
                        gap,
                        start = %fresh.start_time,
                        "gap exceeded tolerance, opened new engagement segment"
                    );
                }
            }
        }

        {
            let mut wm = self.watermarks.lock().await;
            wm.last_processed_message_time = Some(match wm.last_processed_message_time {
                Some(prev) => prev.max(message_time),
                None => message_time,
            });
        }

        self.persist().await;
        Ok(())
    }

    /// Fire the impression rebuild if the person's accumulated count has
    /// reached the engagement threshold.
    ///
    /// On trigger the person's entry is removed first -- the removed list
    /// *is* the immutable snapshot handed to the sink -- so no two
    /// triggered snapshots can ever overlap in content. Returns whether a
    /// trigger fired.
    pub async fn evaluate_and_maybe_trigger(&self, person: &PersonId) -> bool {
        let total = self.total_message_count(person);
        if total < self.config.engagement_threshold {
            if total > 0 {
                debug!(
                    person = %person,
                    total,
                    threshold = self.config.engagement_threshold,
                    "engagement below threshold"
                );
            }
            return false;
        }

        let Some((_, segments)) = self.persons.remove(person) else {
            return false;
        };

        info!(
            person = %person,
            total,
            segments = segments.len(),
            "engagement threshold reached, submitting impression rebuild"
        );
        self.impressions.submit(person.clone(), segments);
        self.persist().await;
        true
    }

    /// Evaluate every tracked person, as the reply loop does once per
    /// processing cycle. Returns how many triggers fired.
    pub async fn evaluate_all(&self) -> usize {
        let persons: Vec<PersonId> = self.persons.iter().map(|e| e.key().clone()).collect();
        let mut fired = 0;
        for person in &persons {
            if self.evaluate_and_maybe_trigger(person).await {
                fired += 1;
            }
        }
        fired
    }

    /// Drop all segments for one person without triggering anything.
    ///
    /// Returns whether the person was tracked.
    pub async fn force_clear(&self, person: &PersonId) -> bool {
        match self.persons.remove(person) {
            Some((_, segments)) => {
                info!(person = %person, segments = segments.len(), "force-cleared engagement segments");
                self.persist().await;
                true
            }
            None => false,
        }
    }

    /// Prune stale and excess segments if the cleanup interval has elapsed.
    ///
    /// `now` is the driver's wall clock; cleanup deliberately ages segments
    /// against real time, not against the last processed message time.
    /// Returns whether anything was removed.
    pub async fn maybe_cleanup(&self, now: DateTime<Utc>) -> bool {
        if !self.cleanup.enable_cleanup {
            return false;
        }

        let interval = Duration::hours(i64::from(self.cleanup.cleanup_interval_hours));
        {
            let wm = self.watermarks.lock().await;
            if let Some(last) = wm.last_cleanup_time {
                if now - last < interval {
                    return false;
                }
            }
        }

        let mut stats = CleanupStats::default();
        self.persons.retain(|person, segments| {
            stats.segments_before += segments.len();
            let removed = prune_segments(segments, now, &self.cleanup);
            stats.segments_removed += removed;
            if removed > 0 {
                stats.persons_touched += 1;
            }
            if segments.is_empty() {
                stats.persons_removed += 1;
                debug!(person = %person, "removed person with no remaining segments");
                false
            } else {
                stats.segments_after += segments.len();
                true
            }
        });

        {
            let mut wm = self.watermarks.lock().await;
            wm.last_cleanup_time = Some(now);
        }

        if stats.changed() {
            info!(
                persons_touched = stats.persons_touched,
                persons_removed = stats.persons_removed,
                segments_removed = stats.segments_removed,
                segments_before = stats.segments_before,
                segments_after = stats.segments_after,
                "segment cleanup finished"
            );
            self.persist().await;
        } else {
            debug!("segment cleanup found nothing to remove");
        }

        stats.changed()
    }

    /// Sum of segment message counts for one person.
    pub fn total_message_count(&self, person: &PersonId) -> u32 {
        self.persons
            .get(person)
            .map(|segments| segments.iter().map(|s| s.message_count).sum())
            .unwrap_or(0)
    }

    /// Number of segments currently tracked for one person.
    pub fn segment_count(&self, person: &PersonId) -> usize {
        self.persons.get(person).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of persons currently tracked.
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    /// Assemble the current state as a versioned snapshot.
    pub async fn snapshot(&self) -> EngagementSnapshot {
        let wm = *self.watermarks.lock().await;
        EngagementSnapshot {
            version: kindred_types::engagement::SNAPSHOT_VERSION,
            persons: self
                .persons
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            last_processed_message_time: wm.last_processed_message_time,
            last_cleanup_time: wm.last_cleanup_time,
        }
    }

    /// Human-readable state dump for logs and debugging.
    pub async fn status_report(&self) -> String {
        let wm = *self.watermarks.lock().await;
        let mut report = format!("engagement state for stream {}\n", self.stream);

        let _ = writeln!(
            report,
            "last processed message: {}",
            wm.last_processed_message_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
        let _ = writeln!(
            report,
            "last cleanup: {}",
            wm.last_cleanup_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
        let _ = writeln!(
            report,
            "cleanup: {} (max age {}d, cap {}/person)",
            if self.cleanup.enable_cleanup { "enabled" } else { "disabled" },
            self.cleanup.max_segment_age_days,
            self.cleanup.max_segments_per_person
        );
        let _ = writeln!(report, "persons tracked: {}", self.persons.len());

        for entry in self.persons.iter() {
            let (person, segments) = (entry.key(), entry.value());
            let total: u32 = segments.iter().map(|s| s.message_count).sum();
            let _ = writeln!(
                report,
                "  {person}: {total}/{} messages in {} segment(s)",
                self.config.engagement_threshold,
                segments.len()
            );
            for (i, seg) in segments.iter().enumerate() {
                let _ = writeln!(
                    report,
                    "    segment {}: {} -> {} (last message {}, {} messages)",
                    i + 1,
                    seg.start_time.to_rfc3339(),
                    seg.end_time.to_rfc3339(),
                    seg.last_message_time.to_rfc3339(),
                    seg.message_count
                );
            }
        }

        report
    }

    /// Open a segment anchored at `message_time`, backdated to include up
    /// to `segment_lookback` preceding messages of lead-in context.
    async fn open_segment(
        &self,
        message_time: DateTime<Utc>,
    ) -> Result<ActivitySegment, MessageLogError> {
        let lookback = self.config.segment_lookback as usize;
        let before = self.log.fetch_before(message_time, lookback).await?;
        let start_time = before.first().map(|m| m.time).unwrap_or(message_time);
        let message_count = self.log.count_inclusive(start_time, message_time).await?;

        Ok(ActivitySegment {
            start_time,
            end_time: message_time,
            last_message_time: message_time,
            message_count,
        })
    }

    /// Compute the closing interval for a segment being superseded: its end
    /// extends to the `segment_lookahead`-th message after its last one if
    /// that many exist, otherwise it stays where it is.
    async fn close_segment(
        &self,
        segment: &ActivitySegment,
    ) -> Result<(DateTime<Utc>, u32), MessageLogError> {
        let lookahead = self.config.segment_lookahead as usize;
        let after = self
            .log
            .fetch_after(segment.last_message_time, lookahead)
            .await?;
        let end_time = if after.len() >= lookahead && lookahead > 0 {
            after[lookahead - 1].time
        } else {
            segment.end_time
        };
        let count = self.log.count_inclusive(segment.start_time, end_time).await?;
        Ok((end_time, count))
    }

    /// Write the snapshot out, best-effort and time-bounded.
    async fn persist(&self) {
        let snapshot = self.snapshot().await;
        match tokio::time::timeout(SAVE_TIMEOUT, self.snapshots.save(&self.stream, &snapshot)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    stream = %self.stream,
                    error = %err,
                    "failed to persist engagement snapshot, in-memory state remains authoritative"
                );
            }
            Err(_) => {
                warn!(
                    stream = %self.stream,
                    timeout_secs = SAVE_TIMEOUT.as_secs(),
                    "engagement snapshot save timed out, in-memory state remains authoritative"
                );
            }
        }
    }
}
