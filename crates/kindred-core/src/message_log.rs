//! MessageLog trait definition.
//!
//! The engagement tracker never reads message content; it only needs
//! counts and timestamps from the host's message storage. This port keeps
//! the storage format (SQLite, flat files, whatever the transport uses)
//! out of the core. Uses native async fn in traits (RPITIT, Rust 2024
//! edition); implementations live with the host's storage layer.

use chrono::{DateTime, Utc};
use kindred_types::error::MessageLogError;

/// Timestamp of one stored message.
///
/// The tracker cares about nothing else; content, sender, and platform
/// metadata stay on the host's side of this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageStamp {
    pub time: DateTime<Utc>,
}

impl MessageStamp {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

/// Read-only queries against one conversation stream's message history.
pub trait MessageLog: Send + Sync {
    /// Count messages strictly between two instants (both endpoints
    /// excluded). Used for gap detection between activity bursts.
    fn count_between(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u32, MessageLogError>> + Send;

    /// Count messages in `[start, end]`, both endpoints included. Segment
    /// message counts are always this query over the segment's interval.
    fn count_inclusive(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u32, MessageLogError>> + Send;

    /// Up to `limit` messages strictly before `t`, ascending by time (the
    /// first element is the furthest back).
    fn fetch_before(
        &self,
        t: DateTime<Utc>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<MessageStamp>, MessageLogError>> + Send;

    /// Up to `limit` messages strictly after `t`, ascending by time.
    fn fetch_after(
        &self,
        t: DateTime<Utc>,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<MessageStamp>, MessageLogError>> + Send;
}
