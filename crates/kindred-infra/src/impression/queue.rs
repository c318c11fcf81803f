//! Impression update queue.
//!
//! Owns the background work the engagement tracker fires and forgets: a
//! Tokio mpsc channel feeding one worker task that runs the expensive
//! impression rebuild per submitted engagement window. Updater failures
//! are logged here and go nowhere else -- the tracker state that produced
//! the job was already cleared when it was enqueued.

use kindred_core::impression::ImpressionSink;
use kindred_types::engagement::{ActivitySegment, PersonId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The expensive downstream computation: rebuild one person's relationship
/// impression from the messages inside their engagement window.
///
/// Implementations live with the host's LLM plumbing. Errors are opaque to
/// the queue; they are logged and dropped, never retried.
pub trait ImpressionUpdater: Send + Sync + 'static {
    fn update(
        &self,
        person: PersonId,
        segments: Vec<ActivitySegment>,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// One queued rebuild, tagged for log correlation.
struct ImpressionJob {
    id: Uuid,
    person: PersonId,
    segments: Vec<ActivitySegment>,
}

/// Sending half of the impression work queue.
///
/// Cloneable; the tracker holds this as its `ImpressionSink` and nothing
/// else -- no task handle, no result channel.
#[derive(Clone)]
pub struct ImpressionQueue {
    sender: mpsc::UnboundedSender<ImpressionJob>,
}

impl ImpressionQueue {
    /// Spawn the worker and return the queue plus the worker's handle.
    ///
    /// The handle belongs to the host for shutdown sequencing; the queue
    /// side never joins it. The worker drains until the channel closes or
    /// `shutdown` fires.
    pub fn spawn<U: ImpressionUpdater>(
        updater: U,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ImpressionJob>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("impression worker shutting down");
                        break;
                    }
                    job = receiver.recv() => {
                        let Some(job) = job else { break };
                        debug!(
                            job = %job.id,
                            person = %job.person,
                            segments = job.segments.len(),
                            "impression rebuild started"
                        );
                        if let Err(err) = updater.update(job.person.clone(), job.segments).await {
                            warn!(
                                job = %job.id,
                                person = %job.person,
                                error = %err,
                                "impression rebuild failed"
                            );
                        }
                    }
                }
            }
        });

        (Self { sender }, handle)
    }
}

impl ImpressionSink for ImpressionQueue {
    fn submit(&self, person: PersonId, segments: Vec<ActivitySegment>) {
        let job = ImpressionJob {
            id: Uuid::now_v7(),
            person,
            segments,
        };
        if let Err(err) = self.sender.send(job) {
            // Host is shutting down; the rebuild is lost, which is fine --
            // the person will simply re-accumulate engagement.
            warn!(person = %err.0.person, "impression queue closed, dropping rebuild");
        }
    }
}
