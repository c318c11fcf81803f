use thiserror::Error;

/// Errors from message log queries.
///
/// The log is an external collaborator; its failures surface to the driver
/// through `record_activity` and are never fatal to the host.
#[derive(Debug, Error)]
pub enum MessageLogError {
    #[error("message log connection error")]
    Connection,

    #[error("message log query error: {0}")]
    Query(String),
}

/// Errors from snapshot persistence.
///
/// Logged and swallowed at every call site; a failed save leaves in-memory
/// state as the (temporarily non-durable) source of truth.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialize(String),
}

/// Errors from the durable fact store.
#[derive(Debug, Error)]
pub enum FactStoreError {
    #[error("fact store connection error")]
    Connection,

    #[error("fact store query error: {0}")]
    Query(String),
}

/// Upstream fact extraction failure.
///
/// Cached as an unknown fact rather than retried, so a flaky extractor
/// cannot cause a tight retry loop.
#[derive(Debug, Error)]
#[error("fact extraction failed: {0}")]
pub struct FetchError(pub String);
