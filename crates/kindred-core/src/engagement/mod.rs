//! Engagement window tracking: activity segments, threshold triggering,
//! cleanup, and snapshot persistence.

pub mod cleanup;
pub mod snapshot;
pub mod tracker;
