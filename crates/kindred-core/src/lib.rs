//! Business logic and port trait definitions for Kindred.
//!
//! This crate defines the "ports" (message log, snapshot store, durable
//! fact store, impression sink) that the infrastructure layer implements.
//! It depends only on `kindred-types` -- never on `kindred-infra` or any
//! database/IO crate.

pub mod engagement;
pub mod fact;
pub mod impression;
pub mod message_log;
