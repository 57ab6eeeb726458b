//! Memoization of authority calls, one bounded store per operation kind.
use crate::authority::{NameMatch, Source};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Key/value storage behind a [`Memo`]. Implementations decide eviction.
pub trait CacheStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn insert(&self, key: String, value: V);
    fn clear(&self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct LruState<V> {
    entries: HashMap<String, (V, u64)>,
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl<V> LruState<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Bounded store evicting the least recently used entry.
pub struct LruCache<V> {
    capacity: usize,
    state: Mutex<LruState<V>>,
}

impl<V> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Clone + Send> CacheStore<V> for LruCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().ok()?;
        let tick = state.next_tick();
        let (value, old_tick) = {
            let entry = state.entries.get_mut(key)?;
            let old = entry.1;
            entry.1 = tick;
            (entry.0.clone(), old)
        };
        state.recency.remove(&old_tick);
        state.recency.insert(tick, key.to_string());
        Some(value)
    }

    fn insert(&self, key: String, value: V) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let tick = state.next_tick();
        if let Some((_, old_tick)) = state.entries.remove(&key) {
            state.recency.remove(&old_tick);
        } else if state.entries.len() >= self.capacity {
            if let Some((_, evicted)) = state.recency.pop_first() {
                state.entries.remove(&evicted);
                debug!("Evicted cache entry for {}", evicted);
            }
        }
        state.recency.insert(tick, key.clone());
        state.entries.insert(key, (value, tick));
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.recency.clear();
        }
    }

    fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }
}

/// Store that keeps nothing; every lookup misses.
pub struct NullCache<V>(PhantomData<fn() -> V>);

impl<V> NullCache<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for NullCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> for NullCache<V> {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn insert(&self, _key: String, _value: V) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Answered from the cache.
    pub hits: u64,
    /// Computed, i.e. an external call was issued.
    pub misses: u64,
}

/// A store plus hit/miss accounting.
pub struct Memo<V> {
    store: Box<dyn CacheStore<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + 'static> Memo<V> {
    pub fn new(store: Box<dyn CacheStore<V>>) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value, or runs `compute` and caches its `Ok` value.
    /// Errors are returned uncached so a later call retries. Concurrent misses
    /// on the same key may both compute; the last write wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.store.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute().await?;
        self.store.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

/// Operation kinds that get their own store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    ResolutionExact,
    ResolutionPartial,
    SpeciesMatch,
    GenusMatch,
    ItisSearch,
    CandidateSearch,
    AcceptedName,
}

impl CacheKind {
    pub const ALL: [CacheKind; 7] = [
        CacheKind::ResolutionExact,
        CacheKind::ResolutionPartial,
        CacheKind::SpeciesMatch,
        CacheKind::GenusMatch,
        CacheKind::ItisSearch,
        CacheKind::CandidateSearch,
        CacheKind::AcceptedName,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CacheKind::ResolutionExact => Source::ResolutionService.label(),
            CacheKind::ResolutionPartial => "resolution-partial",
            CacheKind::SpeciesMatch => Source::LookupA.label(),
            CacheKind::GenusMatch => "genus-match",
            CacheKind::ItisSearch => Source::LookupB.label(),
            CacheKind::CandidateSearch => "candidate-search",
            CacheKind::AcceptedName => "accepted-name",
        }
    }
}

/// Builds the store for each operation kind.
pub trait StoreFactory {
    fn create<V: Clone + Send + 'static>(&self, kind: CacheKind) -> Box<dyn CacheStore<V>>;
}

/// LRU stores of a fixed capacity; capacity `0` disables caching.
#[derive(Debug, Clone, Copy)]
pub struct LruFactory {
    pub capacity: usize,
}

impl StoreFactory for LruFactory {
    fn create<V: Clone + Send + 'static>(&self, _kind: CacheKind) -> Box<dyn CacheStore<V>> {
        if self.capacity == 0 {
            Box::new(NullCache::new())
        } else {
            Box::new(LruCache::new(self.capacity))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub per_authority: BTreeMap<String, CacheStats>,
}

/// Every memoized operation of a [`crate::filter::TaxonFilter`].
pub struct ValidationCache {
    resolution_exact: Memo<Option<NameMatch>>,
    resolution_partial: Memo<Option<NameMatch>>,
    species_match: Memo<Option<NameMatch>>,
    genus_match: Memo<bool>,
    itis_search: Memo<Option<NameMatch>>,
    candidate_search: Memo<Vec<String>>,
    accepted_name: Memo<Option<String>>,
}

impl ValidationCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_factory(&LruFactory { capacity })
    }

    pub fn with_factory<F: StoreFactory>(factory: &F) -> Self {
        Self {
            resolution_exact: Memo::new(factory.create(CacheKind::ResolutionExact)),
            resolution_partial: Memo::new(factory.create(CacheKind::ResolutionPartial)),
            species_match: Memo::new(factory.create(CacheKind::SpeciesMatch)),
            genus_match: Memo::new(factory.create(CacheKind::GenusMatch)),
            itis_search: Memo::new(factory.create(CacheKind::ItisSearch)),
            candidate_search: Memo::new(factory.create(CacheKind::CandidateSearch)),
            accepted_name: Memo::new(factory.create(CacheKind::AcceptedName)),
        }
    }

    /// Store for exact-chain attempts against `source`. The resolution service
    /// shares it with exact resolution in `normalize_to_accepted_name`.
    pub fn for_source(&self, source: Source) -> &Memo<Option<NameMatch>> {
        match source {
            Source::ResolutionService => &self.resolution_exact,
            Source::LookupA => &self.species_match,
            Source::LookupB => &self.itis_search,
        }
    }

    pub fn resolution_partial(&self) -> &Memo<Option<NameMatch>> {
        &self.resolution_partial
    }

    pub fn genus_match(&self) -> &Memo<bool> {
        &self.genus_match
    }

    pub fn candidate_search(&self) -> &Memo<Vec<String>> {
        &self.candidate_search
    }

    pub fn accepted_name(&self) -> &Memo<Option<String>> {
        &self.accepted_name
    }

    fn stats_for(&self, kind: CacheKind) -> CacheStats {
        match kind {
            CacheKind::ResolutionExact => self.resolution_exact.stats(),
            CacheKind::ResolutionPartial => self.resolution_partial.stats(),
            CacheKind::SpeciesMatch => self.species_match.stats(),
            CacheKind::GenusMatch => self.genus_match.stats(),
            CacheKind::ItisSearch => self.itis_search.stats(),
            CacheKind::CandidateSearch => self.candidate_search.stats(),
            CacheKind::AcceptedName => self.accepted_name.stats(),
        }
    }

    pub fn stats(&self) -> ValidationStats {
        ValidationStats {
            per_authority: CacheKind::ALL
                .iter()
                .map(|kind| (kind.label().to_string(), self.stats_for(*kind)))
                .collect(),
        }
    }

    /// Drops every cached entry; hit/miss counters keep running.
    pub fn clear(&self) {
        self.resolution_exact.clear();
        self.resolution_partial.clear();
        self.species_match.clear();
        self.genus_match.clear();
        self.itis_search.clear();
        self.candidate_search.clear();
        self.accepted_name.clear();
        debug!("Validation cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache: LruCache<u32> = LruCache::new(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c".to_string(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn lru_overwrite_does_not_evict() {
        let cache: LruCache<u32> = LruCache::new(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("a".to_string(), 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn lru_keys_are_case_sensitive() {
        let cache: LruCache<bool> = LruCache::new(4);
        cache.insert("Rosa canina".to_string(), true);
        assert_eq!(cache.get("rosa canina"), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn memo_counts_hits_and_misses() {
        let memo: Memo<bool> = Memo::new(Box::new(LruCache::new(10)));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = memo
                .get_or_try_insert_with("Rosa canina", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(true)
                })
                .await
                .unwrap();
            assert!(value);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[tokio::test]
    async fn memo_does_not_cache_errors() {
        let memo: Memo<bool> = Memo::new(Box::new(LruCache::new(10)));
        let failed: Result<bool, &str> = memo
            .get_or_try_insert_with("Rosa canina", || async { Err("timeout") })
            .await;
        assert!(failed.is_err());
        assert!(memo.is_empty());

        let ok: Result<bool, &str> = memo
            .get_or_try_insert_with("Rosa canina", || async { Ok(false) })
            .await;
        assert_eq!(ok, Ok(false));
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn zero_capacity_disables_caching() {
        let cache = ValidationCache::new(0);
        for _ in 0..2 {
            cache
                .genus_match()
                .get_or_try_insert_with("Quercus", || async { Ok::<_, ()>(true) })
                .await
                .unwrap();
        }
        assert_eq!(cache.genus_match().stats(), CacheStats { hits: 0, misses: 2 });
    }

    #[test]
    fn stats_cover_every_kind() {
        let cache = ValidationCache::new(10);
        let stats = cache.stats();
        assert_eq!(stats.per_authority.len(), CacheKind::ALL.len());
        assert!(stats.per_authority.contains_key("resolution-service"));
        assert!(stats.per_authority.contains_key("lookup-a"));
        assert!(stats.per_authority.contains_key("lookup-b"));
    }

    struct CountingFactory {
        created: AtomicUsize,
    }

    impl StoreFactory for CountingFactory {
        fn create<V: Clone + Send + 'static>(&self, _kind: CacheKind) -> Box<dyn CacheStore<V>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(NullCache::new())
        }
    }

    #[test]
    fn factory_builds_one_store_per_kind() {
        let factory = CountingFactory {
            created: AtomicUsize::new(0),
        };
        let _cache = ValidationCache::with_factory(&factory);
        assert_eq!(factory.created.load(Ordering::SeqCst), CacheKind::ALL.len());
    }
}
