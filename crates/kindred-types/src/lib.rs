//! Shared domain types for Kindred.
//!
//! This crate contains the core domain types used across the Kindred
//! engagement subsystem: activity segments, fact cache entries,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod engagement;
pub mod error;
pub mod fact;
