//! ImpressionSink trait definition.
//!
//! When a person's accumulated activity crosses the engagement threshold,
//! the tracker hands their segment list to an impression updater and moves
//! on. The handoff is a synchronous enqueue into externally-owned work:
//! the tracker never holds a task handle, never waits on completion, and
//! never observes failure -- by the time the update runs, the tracker
//! state that produced it is already cleared.

use kindred_types::engagement::{ActivitySegment, PersonId};

/// Fire-and-forget consumer of triggered engagement windows.
///
/// Implementations (a Tokio mpsc queue in kindred-infra, a recording stub
/// in tests) must not block the caller.
pub trait ImpressionSink: Send + Sync {
    /// Submit one person's segment list for an impression rebuild.
    ///
    /// The segments are the immutable trigger snapshot; the tracker has
    /// already deleted its own copy when this is called.
    fn submit(&self, person: PersonId, segments: Vec<ActivitySegment>);
}
