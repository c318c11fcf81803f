//! Cycle-bounded fact cache.
//!
//! Sits between the reply path and the durable fact store. A live cache
//! entry is authoritative: within its validity window the store is not
//! re-queried and the fetcher is not re-invoked, whatever the entry says
//! -- including "nothing is known". Entries age by processing cycle, not
//! wall clock: the reply loop calls [`FactCache::decay`] once per cycle.

use dashmap::DashMap;
use tracing::{debug, info, warn};

use kindred_types::config::FactCacheConfig;
use kindred_types::engagement::PersonId;
use kindred_types::fact::{FactCacheEntry, FactKey, FactKind, FactLookup, UNKNOWN_FACT};

use crate::fact::store::{DurableFactStore, FactFetcher, FetchOutcome};

/// In-memory fact cache over a durable store.
///
/// Keys are flat `(person, kind)` composites; the map's shard locks are
/// the only synchronization, so lookups for different people never
/// contend.
pub struct FactCache<D> {
    store: D,
    config: FactCacheConfig,
    entries: DashMap<FactKey, FactCacheEntry>,
}

impl<D: DurableFactStore> FactCache<D> {
    pub fn new(store: D, config: FactCacheConfig) -> Self {
        Self {
            store,
            config,
            entries: DashMap::new(),
        }
    }

    /// Look up one fact, consulting (in order) the live cache, the durable
    /// store, and finally the expensive fetcher.
    ///
    /// Every path records a cache entry, including failures: a fetch that
    /// errors is cached as unknown so a flaky extractor is not hammered on
    /// every reply.
    pub async fn get_or_fetch<F: FactFetcher>(
        &self,
        person: &PersonId,
        kind: &FactKind,
        fetcher: &F,
    ) -> FactLookup {
        let key = FactKey::new(person.clone(), kind.clone());

        if let Some(entry) = self.entries.get(&key) {
            debug!(person = %person, kind = %kind, known = entry.known, "fact served from cache");
            return lookup_of(&entry);
        }

        match self.store.get(person, kind).await {
            Ok(Some(value)) if !value.is_empty() => {
                let known = value != UNKNOWN_FACT;
                let entry = if known {
                    info!(person = %person, kind = %kind, "fact recalled from durable store");
                    FactCacheEntry::known(value, self.config.durable_hit_ttl)
                } else {
                    debug!(person = %person, kind = %kind, "durable store remembers drawing a blank");
                    FactCacheEntry::unknown(self.config.durable_hit_ttl)
                };
                let result = lookup_of(&entry);
                self.entries.insert(key, entry);
                return result;
            }
            Ok(_) => {}
            Err(err) => {
                // Degrade to the fetch path; the store may recover later.
                warn!(person = %person, kind = %kind, error = %err, "durable fact store probe failed");
            }
        }

        let entry = match fetcher.fetch(person, kind).await {
            Ok(FetchOutcome::Extracted(value)) if !value.is_empty() && value != UNKNOWN_FACT => {
                info!(person = %person, kind = %kind, "fact extracted");
                self.write_back(person, kind, &value).await;
                FactCacheEntry::known(value, self.config.extraction_ttl)
            }
            Ok(FetchOutcome::Extracted(_)) | Ok(FetchOutcome::Nothing) => {
                info!(person = %person, kind = %kind, "extraction found nothing");
                self.write_back(person, kind, UNKNOWN_FACT).await;
                FactCacheEntry::unknown(self.config.extraction_ttl)
            }
            Ok(FetchOutcome::NoBackground) => {
                info!(person = %person, kind = %kind, "no long-term knowledge of this person");
                self.write_back(person, kind, UNKNOWN_FACT).await;
                FactCacheEntry::unknown(self.config.no_background_ttl)
            }
            Err(err) => {
                warn!(person = %person, kind = %kind, error = %err, "fact extraction failed, caching as unknown");
                self.write_back(person, kind, UNKNOWN_FACT).await;
                FactCacheEntry::unknown(self.config.extraction_ttl)
            }
        };

        let result = lookup_of(&entry);
        self.entries.insert(key, entry);
        result
    }

    /// Age every entry by one processing cycle and evict the expired.
    ///
    /// Called once per reply-context construction, not on a timer.
    pub fn decay(&self) {
        self.entries.retain(|_, entry| {
            entry.ttl -= 1;
            entry.ttl > 0
        });
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live entry exists for this person/kind pair.
    pub fn contains(&self, person: &PersonId, kind: &FactKind) -> bool {
        self.entries
            .contains_key(&FactKey::new(person.clone(), kind.clone()))
    }

    async fn write_back(&self, person: &PersonId, kind: &FactKind, value: &str) {
        if let Err(err) = self.store.set(person, kind, value).await {
            warn!(person = %person, kind = %kind, error = %err, "fact write-back failed");
        }
    }
}

fn lookup_of(entry: &FactCacheEntry) -> FactLookup {
    if entry.known {
        FactLookup::Known(entry.value.clone())
    } else {
        FactLookup::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_types::error::{FactStoreError, FetchError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Store fake that counts probes.
    #[derive(Clone, Default)]
    struct MemoryStore {
        facts: Arc<Mutex<HashMap<(String, String), String>>>,
        gets: Arc<AtomicUsize>,
    }

    impl MemoryStore {
        fn with(person: &str, kind: &str, value: &str) -> Self {
            let store = Self::default();
            store
                .facts
                .lock()
                .unwrap()
                .insert((person.to_string(), kind.to_string()), value.to_string());
            store
        }
    }

    impl DurableFactStore for MemoryStore {
        async fn get(
            &self,
            person: &PersonId,
            kind: &FactKind,
        ) -> Result<Option<String>, FactStoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .facts
                .lock()
                .unwrap()
                .get(&(person.to_string(), kind.to_string()))
                .cloned())
        }

        async fn set(
            &self,
            person: &PersonId,
            kind: &FactKind,
            value: &str,
        ) -> Result<(), FactStoreError> {
            self.facts
                .lock()
                .unwrap()
                .insert((person.to_string(), kind.to_string()), value.to_string());
            Ok(())
        }
    }

    /// Fetcher fake returning a fixed outcome, counting invocations.
    struct FixedFetcher {
        outcome: Result<FetchOutcome, ()>,
        calls: AtomicUsize,
    }

    impl FixedFetcher {
        fn returning(outcome: FetchOutcome) -> Self {
            Self {
                outcome: Ok(outcome),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                outcome: Err(()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FactFetcher for FixedFetcher {
        async fn fetch(
            &self,
            _person: &PersonId,
            _kind: &FactKind,
        ) -> Result<FetchOutcome, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Ok(outcome) => Ok(outcome.clone()),
                Err(()) => Err(FetchError("model unavailable".to_string())),
            }
        }
    }

    fn cache_over(store: MemoryStore) -> FactCache<MemoryStore> {
        FactCache::new(store, FactCacheConfig::default())
    }

    #[tokio::test]
    async fn durable_hit_skips_the_fetcher() {
        let cache = cache_over(MemoryStore::with("p1", "age", "27"));
        let fetcher = FixedFetcher::returning(FetchOutcome::Nothing);

        let result = cache
            .get_or_fetch(&PersonId::new("p1"), &FactKind::new("age"), &fetcher)
            .await;

        assert_eq!(result, FactLookup::Known("27".to_string()));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn durable_sentinel_hit_is_unknown_without_fetching() {
        let cache = cache_over(MemoryStore::with("p1", "age", UNKNOWN_FACT));
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("27".to_string()));

        let result = cache
            .get_or_fetch(&PersonId::new("p1"), &FactKind::new("age"), &fetcher)
            .await;

        assert_eq!(result, FactLookup::Unknown);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn miss_extracts_and_writes_back() {
        let store = MemoryStore::default();
        let cache = cache_over(store.clone());
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("teaches piano".to_string()));
        let (person, kind) = (PersonId::new("p1"), FactKind::new("job"));

        let result = cache.get_or_fetch(&person, &kind, &fetcher).await;

        assert_eq!(result, FactLookup::Known("teaches piano".to_string()));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(
            store.facts.lock().unwrap()[&("p1".to_string(), "job".to_string())],
            "teaches piano"
        );
    }

    #[tokio::test]
    async fn cached_entry_is_authoritative_until_decay() {
        let store = MemoryStore::default();
        let cache = cache_over(store.clone());
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("yes".to_string()));
        let (person, kind) = (PersonId::new("p1"), FactKind::new("pets"));

        cache.get_or_fetch(&person, &kind, &fetcher).await;
        let probes_after_first = store.gets.load(Ordering::SeqCst);
        cache.get_or_fetch(&person, &kind, &fetcher).await;
        cache.get_or_fetch(&person, &kind, &fetcher).await;

        // Neither the fetcher nor the store saw the repeat lookups.
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(store.gets.load(Ordering::SeqCst), probes_after_first);
    }

    #[tokio::test]
    async fn empty_extraction_caches_unknown_and_persists_sentinel() {
        let store = MemoryStore::default();
        let cache = cache_over(store.clone());
        let fetcher = FixedFetcher::returning(FetchOutcome::Nothing);
        let (person, kind) = (PersonId::new("p1"), FactKind::new("hometown"));

        let result = cache.get_or_fetch(&person, &kind, &fetcher).await;

        assert_eq!(result, FactLookup::Unknown);
        assert_eq!(
            store.facts.lock().unwrap()[&("p1".to_string(), "hometown".to_string())],
            UNKNOWN_FACT
        );
        // The cached blank keeps the fetcher idle on the next lookup.
        cache.get_or_fetch(&person, &kind, &fetcher).await;
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_cached_as_unknown() {
        let store = MemoryStore::default();
        let cache = cache_over(store.clone());
        let fetcher = FixedFetcher::failing();
        let (person, kind) = (PersonId::new("p1"), FactKind::new("age"));

        let result = cache.get_or_fetch(&person, &kind, &fetcher).await;

        assert_eq!(result, FactLookup::Unknown);
        assert_eq!(fetcher.call_count(), 1);
        // No tight retry loop: the failure entry absorbs the next lookup.
        cache.get_or_fetch(&person, &kind, &fetcher).await;
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn decay_decrements_and_evicts_at_zero() {
        let cache = FactCache::new(
            MemoryStore::default(),
            FactCacheConfig {
                extraction_ttl: 1,
                ..FactCacheConfig::default()
            },
        );
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("x".to_string()));
        let (person, kind) = (PersonId::new("p1"), FactKind::new("k"));

        cache.get_or_fetch(&person, &kind, &fetcher).await;
        assert!(cache.contains(&person, &kind));

        cache.decay();
        assert!(!cache.contains(&person, &kind));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn decay_ages_every_entry_by_one() {
        let cache = cache_over(MemoryStore::default());
        let known = FixedFetcher::returning(FetchOutcome::Extracted("v".to_string()));
        let stranger = FixedFetcher::returning(FetchOutcome::NoBackground);
        let person = PersonId::new("p1");

        // extraction_ttl = 3 and no_background_ttl = 2.
        cache.get_or_fetch(&person, &FactKind::new("a"), &known).await;
        cache.get_or_fetch(&person, &FactKind::new("b"), &stranger).await;
        assert_eq!(cache.len(), 2);

        cache.decay();
        assert_eq!(cache.len(), 2);
        cache.decay();
        // The ttl=2 entry expires on the second decay.
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&person, &FactKind::new("a")));
        cache.decay();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn durable_refresh_after_decay_reuses_written_back_fact() {
        // Extract once, let the entry decay away, then look up again: the
        // write-back means round two is a durable hit, not a re-fetch.
        let store = MemoryStore::default();
        let cache = cache_over(store.clone());
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("violinist".to_string()));
        let (person, kind) = (PersonId::new("p1"), FactKind::new("job"));

        cache.get_or_fetch(&person, &kind, &fetcher).await;
        cache.decay();
        cache.decay();
        cache.decay();
        assert!(cache.is_empty());

        let result = cache.get_or_fetch(&person, &kind, &fetcher).await;
        assert_eq!(result, FactLookup::Known("violinist".to_string()));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn store_probe_failure_degrades_to_fetch() {
        struct BrokenStore;

        impl DurableFactStore for BrokenStore {
            async fn get(
                &self,
                _person: &PersonId,
                _kind: &FactKind,
            ) -> Result<Option<String>, FactStoreError> {
                Err(FactStoreError::Connection)
            }

            async fn set(
                &self,
                _person: &PersonId,
                _kind: &FactKind,
                _value: &str,
            ) -> Result<(), FactStoreError> {
                Err(FactStoreError::Connection)
            }
        }

        let cache = FactCache::new(BrokenStore, FactCacheConfig::default());
        let fetcher = FixedFetcher::returning(FetchOutcome::Extracted("27".to_string()));

        let result = cache
            .get_or_fetch(&PersonId::new("p1"), &FactKind::new("age"), &fetcher)
            .await;

        // Extraction still succeeds; the failed write-back is only logged.
        assert_eq!(result, FactLookup::Known("27".to_string()));
        assert_eq!(fetcher.call_count(), 1);
    }
}
