//! Snapshot persistence implementations.

pub mod file;
