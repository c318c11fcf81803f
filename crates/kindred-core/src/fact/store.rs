//! DurableFactStore and FactFetcher trait definitions.
//!
//! Two ports sit behind the fact cache: the durable store holding facts
//! remembered across sessions, and the fetcher running the expensive
//! extraction when the store comes up empty. Both use native async fn in
//! traits (RPITIT, Rust 2024 edition); the store implementation lives in
//! kindred-infra, the fetcher with the host's LLM plumbing.

use kindred_types::engagement::PersonId;
use kindred_types::error::{FactStoreError, FetchError};
use kindred_types::fact::FactKind;

/// Long-term storage of extracted facts, keyed by person and kind.
///
/// A stored value may be the unknown sentinel ([`UNKNOWN_FACT`]): the
/// record of a lookup that found nothing is itself worth remembering.
///
/// [`UNKNOWN_FACT`]: kindred_types::fact::UNKNOWN_FACT
pub trait DurableFactStore: Send + Sync {
    /// Fetch a fact. `None` means the store has never heard of this
    /// person/kind pair.
    fn get(
        &self,
        person: &PersonId,
        kind: &FactKind,
    ) -> impl std::future::Future<Output = Result<Option<String>, FactStoreError>> + Send;

    /// Store a fact (upsert).
    fn set(
        &self,
        person: &PersonId,
        kind: &FactKind,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), FactStoreError>> + Send;
}

/// What an extraction attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Extraction yielded a usable fact.
    Extracted(String),
    /// Extraction ran and came back empty-handed.
    Nothing,
    /// No long-term knowledge about this person exists at all, so
    /// extraction was skipped outright.
    NoBackground,
}

/// The expensive extraction path, typically an LLM call over whatever
/// impression material the host keeps about the person.
pub trait FactFetcher: Send + Sync {
    fn fetch(
        &self,
        person: &PersonId,
        kind: &FactKind,
    ) -> impl std::future::Future<Output = Result<FetchOutcome, FetchError>> + Send;
}
