//! Engagement tracking types for Kindred.
//!
//! These types model per-person conversational activity: time-bounded
//! activity segments, the engagement state persisted across restarts, and
//! the opaque keys identifying people and conversation streams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fmt;

/// Current snapshot schema version.
///
/// Bumped whenever the persisted layout changes; a loaded snapshot with an
/// unrecognized version is discarded rather than migrated by guesswork.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Opaque stable key identifying a conversational partner.
///
/// Derived upstream from platform + user id; the engagement core never
/// inspects its structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque key naming one conversation stream.
///
/// Each stream owns its own engagement state and snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A contiguous burst of activity from one person.
///
/// `message_count` is the inclusive message-log count over
/// `[start_time, end_time]`. It is a cache of a deterministic query,
/// recomputed whenever the interval changes, never incremented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySegment {
    /// Start of the interval, backdated to include a little lead-in context.
    pub start_time: DateTime<Utc>,
    /// End of the interval. Only the tail segment's end ever moves.
    pub end_time: DateTime<Utc>,
    /// Timestamp of the person's most recent message inside this segment.
    pub last_message_time: DateTime<Utc>,
    /// Inclusive message count over `[start_time, end_time]`.
    pub message_count: u32,
}

impl ActivitySegment {
    /// A single-message segment anchored at one instant.
    pub fn at(time: DateTime<Utc>, message_count: u32) -> Self {
        Self {
            start_time: time,
            end_time: time,
            last_message_time: time,
            message_count,
        }
    }
}

/// The persisted engagement state for one conversation stream.
///
/// Serialized as one JSON blob per stream. The `version` field gates
/// loading: mismatched snapshots are dropped, not migrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub version: u32,
    /// Ordered activity segments per person, ascending by `start_time`.
    pub persons: HashMap<PersonId, Vec<ActivitySegment>>,
    /// Newest message timestamp the tracker has processed, if any.
    pub last_processed_message_time: Option<DateTime<Utc>>,
    /// When segment cleanup last ran (wall clock), if ever.
    pub last_cleanup_time: Option<DateTime<Utc>>,
}

impl EngagementSnapshot {
    /// An empty snapshot at the current schema version.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            persons: HashMap::new(),
            last_processed_message_time: None,
            last_cleanup_time: None,
        }
    }
}

impl Default for EngagementSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
