//! SnapshotStore trait definition.
//!
//! Persistence port for engagement state. One serialized blob per
//! conversation stream; saves are best-effort (the tracker logs and
//! carries on in memory when a save fails), loads are infallible (absent
//! or unreadable snapshots yield the empty default).
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).
//! Implementations live in kindred-infra.

use kindred_types::engagement::{EngagementSnapshot, StreamId};
use kindred_types::error::SnapshotError;

/// Durable storage for one-blob-per-stream engagement snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Persist the snapshot for a stream, replacing any previous one.
    fn save(
        &self,
        stream: &StreamId,
        snapshot: &EngagementSnapshot,
    ) -> impl std::future::Future<Output = Result<(), SnapshotError>> + Send;

    /// Load the snapshot for a stream.
    ///
    /// Never fails: a missing file, a parse error, or a version mismatch
    /// all log a warning and return [`EngagementSnapshot::empty`].
    fn load(
        &self,
        stream: &StreamId,
    ) -> impl std::future::Future<Output = EngagementSnapshot> + Send;
}
