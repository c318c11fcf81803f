//! Infrastructure layer for Kindred.
//!
//! Contains implementations of the port traits defined in `kindred-core`:
//! the file-backed snapshot store, SQLite durable fact storage, and the
//! impression work queue, plus the `config.toml` loader.

pub mod config;
pub mod impression;
pub mod snapshot;
pub mod sqlite;
