//! Fact cache types for Kindred.
//!
//! Models the short-lived in-memory cache of facts extracted about a
//! person (age, job, recent events...), backed by durable long-term
//! storage. Entries expire after a fixed number of processing cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::engagement::PersonId;

/// Sentinel stored durably for a fact that was looked up and not found.
///
/// Writing the sentinel back to long-term storage is what keeps a fruitless
/// lookup from being repeated on every reply.
pub const UNKNOWN_FACT: &str = "none";

/// Free-form category of extracted fact ("age", "job", "recent events"...).
///
/// Kinds are produced upstream by the reply planner; the cache treats them
/// as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactKind(pub String);

impl FactKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FactKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Composite cache key: one fact kind for one person.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactKey {
    pub person: PersonId,
    pub kind: FactKind,
}

impl FactKey {
    pub fn new(person: PersonId, kind: FactKind) -> Self {
        Self { person, kind }
    }
}

/// A cached fact with its remaining validity.
///
/// `known = false` records an explicit "looked but found nothing" result;
/// the entry is still authoritative until it decays away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCacheEntry {
    /// The fact text, or the unknown sentinel.
    pub value: String,
    /// Remaining processing cycles before eviction.
    pub ttl: i32,
    /// When this entry was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Whether the value carries real information.
    pub known: bool,
}

impl FactCacheEntry {
    /// A known fact with the given validity.
    pub fn known(value: impl Into<String>, ttl: i32) -> Self {
        Self {
            value: value.into(),
            ttl,
            recorded_at: Utc::now(),
            known: true,
        }
    }

    /// An explicit "nothing found" marker with the given validity.
    pub fn unknown(ttl: i32) -> Self {
        Self {
            value: UNKNOWN_FACT.to_string(),
            ttl,
            recorded_at: Utc::now(),
            known: false,
        }
    }
}

/// Result of a fact lookup as seen by the reply path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactLookup {
    /// A usable fact.
    Known(String),
    /// Looked up, nothing is known; the reply should say so instead of
    /// inventing an answer.
    Unknown,
}

impl FactLookup {
    pub fn is_known(&self) -> bool {
        matches!(self, FactLookup::Known(_))
    }
}
