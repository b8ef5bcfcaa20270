//! # Cache Store
//!
//! Bounded, sharded in-memory store with singleflight computation and an
//! optional external backing store.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     get_or_compute(key, deps, f)                        │
//! │                                                                         │
//! │  lock shard(key)                                                        │
//! │    ├─ entry present, unexpired, versions match ──► HIT (cache_hit=true) │
//! │    ├─ entry expired or version-stale ──► remove, fall through           │
//! │    ├─ computation in flight ──► unlock, await shared result             │
//! │    └─ otherwise ──► register in-flight, spawn fill task, unlock, await  │
//! │                                                                         │
//! │  fill task (runs to completion even if every caller goes away)          │
//! │    1. external store lookup (timeout bounded, errors → memory only)     │
//! │    2. f() on the blocking pool; a panic becomes COMPUTATION_FAILED      │
//! │    3. lock shard: drop in-flight marker, insert entry (failures too)    │
//! │    4. evict least-recently-used entries until both bounds hold          │
//! │    5. write through to the external store                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! Each shard is its own `tokio::sync::Mutex`; requests for keys in
//! different shards never contend. No code path holds two shard locks at
//! once. Entry and byte totals are global atomics so the bounds apply to the
//! whole store, and eviction picks the globally oldest entry by comparing
//! each shard's LRU tail.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use costwise_core::{CalculationResult, CoreError};

use crate::config::{CacheCategory, CacheConfig};
use crate::dependency::{any_stale, CacheDependency};
use crate::error::{CacheError, CacheResult};
use crate::external::{ExternalStore, ExternalTier, RedisStore};
use crate::key::CacheKey;
use crate::stats::{CacheStats, Counters};

/// Result representation held by the store.
pub type StoredResult = CalculationResult<Value>;

// =============================================================================
// Internal State
// =============================================================================

pub(crate) struct CacheEntry {
    pub value: StoredResult,
    pub dependencies: Vec<CacheDependency>,
    pub expires_at: Instant,
    pub size_bytes: usize,
    /// Global access tick, larger is more recent.
    pub last_access: u64,
}

#[derive(Clone)]
struct Filled {
    result: StoredResult,
    from_external: bool,
}

type SharedFill = Shared<BoxFuture<'static, Filled>>;

pub(crate) struct InFlight {
    id: u64,
    fill: SharedFill,
    pub dependencies: Vec<CacheDependency>,
    /// Set when an invalidation hits the key mid-computation; the result is
    /// still delivered to waiters but not stored.
    pub invalidated: bool,
}

pub(crate) struct Shard {
    pub entries: LruCache<CacheKey, CacheEntry>,
    pub in_flight: HashMap<CacheKey, InFlight>,
}

impl Shard {
    fn new() -> Self {
        Shard {
            entries: LruCache::unbounded(),
            in_flight: HashMap::new(),
        }
    }
}

pub(crate) struct StoreInner {
    pub config: CacheConfig,
    pub shards: Vec<Mutex<Shard>>,
    pub external: Option<ExternalTier>,
    pub counters: Counters,
    entry_count: AtomicUsize,
    memory_bytes: AtomicUsize,
    clock: AtomicU64,
    flight_ids: AtomicU64,
}

// =============================================================================
// Cache Store
// =============================================================================

/// Handle to a shared cache. Cloning is cheap and every clone sees the same
/// entries.
#[derive(Clone)]
pub struct CacheStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("shards", &self.inner.shards.len())
            .field("entries", &self.len())
            .field("external", &self.inner.external.is_some())
            .finish()
    }
}

impl CacheStore {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Memory-only store. `external_store` settings are ignored.
    pub fn in_memory(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// Builds the store from configuration, connecting to redis when the
    /// external store is enabled.
    ///
    /// An unreachable store is only an error when
    /// `external_store.fallback_to_memory` is false.
    pub async fn connect(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        if !config.external_store.enabled {
            return Ok(Self::build(config, None));
        }

        match RedisStore::connect(&config.external_store).await {
            Ok(redis) => Self::with_external_store(config, Arc::new(redis)).await,
            Err(e) => Self::fallback(config, e),
        }
    }

    /// Store backed by a caller-supplied external store. The store is pinged
    /// once; the fallback rules of [`CacheStore::connect`] apply.
    pub async fn with_external_store(config: CacheConfig, store: Arc<dyn ExternalStore>) -> CacheResult<Self> {
        config.validate()?;
        let tier = ExternalTier::new(store, &config.external_store);
        match tier.ping().await {
            Ok(()) => {
                info!("External store reachable, running two-tier cache");
                Ok(Self::build(config, Some(tier)))
            }
            Err(e) => Self::fallback(config, e),
        }
    }

    fn fallback(config: CacheConfig, err: CacheError) -> CacheResult<Self> {
        if config.external_store.fallback_to_memory {
            warn!(error = %err, "External store unavailable, running memory-only");
            Ok(Self::build(config, None))
        } else {
            Err(CacheError::ExternalStoreUnavailable(err.to_string()))
        }
    }

    fn build(config: CacheConfig, external: Option<ExternalTier>) -> Self {
        let shards = (0..config.store.shards).map(|_| Mutex::new(Shard::new())).collect();
        debug!(
            shards = config.store.shards,
            max_entries = config.store.max_entries,
            max_memory_mb = config.store.max_memory_mb,
            "Cache store created"
        );
        CacheStore {
            inner: Arc::new(StoreInner {
                config,
                shards,
                external,
                counters: Counters::default(),
                entry_count: AtomicUsize::new(0),
                memory_bytes: AtomicUsize::new(0),
                clock: AtomicU64::new(0),
                flight_ids: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// True when an external store is attached.
    pub fn has_external_store(&self) -> bool {
        self.inner.external.is_some()
    }

    /// Live entries in memory (expired entries count until swept).
    pub fn len(&self) -> usize {
        self.inner.entry_count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes accounted to in-memory entries.
    pub fn memory_usage(&self) -> usize {
        self.inner.memory_bytes.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .counters
            .snapshot(self.len() as u64, self.memory_usage() as u64)
    }

    /// True if `key` holds an unexpired entry.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.contains_fresh(key, &[]).await
    }

    /// True if `key` holds an unexpired entry that `current` does not outdate.
    /// Does not touch recency.
    pub async fn contains_fresh(&self, key: &CacheKey, current: &[CacheDependency]) -> bool {
        self.cached_outcome(key, current).await.is_some()
    }

    /// Whether the fresh entry under `key` is a success, or `None` when there
    /// is no such entry. Does not touch recency.
    pub async fn cached_outcome(&self, key: &CacheKey, current: &[CacheDependency]) -> Option<bool> {
        let shard = self.shard(key).lock().await;
        shard
            .entries
            .peek(key)
            .filter(|entry| entry.expires_at > Instant::now() && !any_stale(&entry.dependencies, current))
            .map(|entry| entry.value.is_success())
    }

    // =========================================================================
    // Get or Compute
    // =========================================================================

    /// Returns the cached result for `calculator.operation(input)`, computing
    /// and storing it on a miss.
    ///
    /// `compute` runs at most once per key at a time; concurrent callers for
    /// the same key share its result. Failed results are cached like
    /// successful ones. Nothing in this path surfaces a cache or external
    /// store error to the caller.
    ///
    /// ## Example
    /// ```rust
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// use costwise_cache::{CacheCategory, CacheConfig, CacheDependency, CacheStore};
    /// use costwise_core::CalculationResult;
    ///
    /// let store = CacheStore::in_memory(CacheConfig::default()).unwrap();
    /// let deps = vec![CacheDependency::inventory_item("42")];
    ///
    /// let first = store
    ///     .get_or_compute("demo", "double", CacheCategory::Default, &21, deps.clone(), || {
    ///         CalculationResult::ok(42)
    ///     })
    ///     .await;
    /// let second = store
    ///     .get_or_compute("demo", "double", CacheCategory::Default, &21, deps, || {
    ///         CalculationResult::ok(0)
    ///     })
    ///     .await;
    ///
    /// assert_eq!(second.value(), Some(&42));
    /// assert!(second.metadata().cache_hit);
    /// # let _ = first;
    /// # });
    /// ```
    #[instrument(skip(self, category, input, dependencies, compute), fields(category = %category))]
    pub async fn get_or_compute<I, T, F>(
        &self,
        calculator: &str,
        operation: &str,
        category: CacheCategory,
        input: &I,
        dependencies: Vec<CacheDependency>,
        compute: F,
    ) -> CalculationResult<T>
    where
        I: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> CalculationResult<T> + Send + 'static,
    {
        let started = Instant::now();
        let compute = move || to_stored(compute());

        let key = match CacheKey::derive(calculator, operation, input) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Cache key derivation failed, computing uncached");
                let result = run_compute(compute).await;
                return from_stored(result).with_timing(started.elapsed(), false);
            }
        };

        let (result, cache_hit) = self.resolve(key, category, dependencies, compute).await;
        from_stored(result).with_timing(started.elapsed(), cache_hit)
    }

    async fn resolve<F>(
        &self,
        key: CacheKey,
        category: CacheCategory,
        dependencies: Vec<CacheDependency>,
        compute: F,
    ) -> (StoredResult, bool)
    where
        F: FnOnce() -> StoredResult + Send + 'static,
    {
        let mut shard = self.shard(&key).lock().await;

        if let Some(hit) = self.lookup_locked(&mut shard, &key, &dependencies) {
            Counters::bump(&self.inner.counters.hits);
            debug!(key = %key, "Cache hit");
            return (hit, true);
        }

        if let Some(flight) = shard.in_flight.get(&key) {
            if !any_stale(&flight.dependencies, &dependencies) {
                let fill = flight.fill.clone();
                drop(shard);
                Counters::bump(&self.inner.counters.coalesced);
                debug!(key = %key, "Joining in-flight computation");
                return (fill.await.result, false);
            }
            debug!(key = %key, "In-flight computation is stale, starting another");
        }

        Counters::bump(&self.inner.counters.misses);
        let id = self.inner.flight_ids.fetch_add(1, Ordering::Relaxed);
        let ttl = self.inner.config.ttl.for_category(category);

        let task = tokio::spawn(self.clone().fill(key.clone(), id, ttl, dependencies.clone(), compute));
        let fill = await_fill(Arc::downgrade(&self.inner), task, key.clone(), id)
            .boxed()
            .shared();
        shard.in_flight.insert(
            key.clone(),
            InFlight {
                id,
                fill: fill.clone(),
                dependencies,
                invalidated: false,
            },
        );
        drop(shard);

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache miss, computing");
        let filled = fill.await;
        (filled.result, filled.from_external)
    }

    /// Returns a fresh entry's value, removing it if expired or stale.
    fn lookup_locked(&self, shard: &mut Shard, key: &CacheKey, current: &[CacheDependency]) -> Option<StoredResult> {
        enum Removal {
            Expired,
            Stale,
        }

        let now = Instant::now();
        let outcome = match shard.entries.get_mut(key) {
            None => return None,
            Some(entry) if entry.expires_at <= now => Err(Removal::Expired),
            Some(entry) if any_stale(&entry.dependencies, current) => Err(Removal::Stale),
            Some(entry) => {
                entry.last_access = self.tick();
                Ok(entry.value.clone())
            }
        };

        match outcome {
            Ok(value) => Some(value),
            Err(reason) => {
                if let Some(entry) = shard.entries.pop(key) {
                    self.release(&entry);
                }
                match reason {
                    Removal::Expired => {
                        Counters::bump(&self.inner.counters.expirations);
                        debug!(key = %key, "Entry expired");
                    }
                    Removal::Stale => {
                        Counters::bump(&self.inner.counters.invalidations);
                        debug!(key = %key, "Entry dependency version changed");
                    }
                }
                None
            }
        }
    }

    /// Body of the spawned fill task.
    async fn fill<F>(
        self,
        key: CacheKey,
        id: u64,
        ttl: Duration,
        dependencies: Vec<CacheDependency>,
        compute: F,
    ) -> Filled
    where
        F: FnOnce() -> StoredResult + Send + 'static,
    {
        if let Some(external) = &self.inner.external {
            if let Some(record) = external.get(&key, &self.inner.counters).await {
                if let Some(remaining) = record.usable_for(&dependencies) {
                    Counters::bump(&self.inner.counters.external_hits);
                    debug!(key = %key, "External store hit");
                    self.store_filled(&key, id, record.value.clone(), dependencies, remaining.min(ttl))
                        .await;
                    self.enforce_bounds().await;
                    return Filled {
                        result: record.value,
                        from_external: true,
                    };
                }
            }
        }

        let result = run_compute(compute).await;
        let stored = self
            .store_filled(&key, id, result.clone(), dependencies.clone(), ttl)
            .await;
        self.enforce_bounds().await;

        if stored {
            if let Some(external) = &self.inner.external {
                external
                    .put(&key, &result, &dependencies, ttl, &self.inner.counters)
                    .await;
            }
        }

        Filled {
            result,
            from_external: false,
        }
    }

    /// Clears the in-flight marker and inserts the entry. Returns false when
    /// the result was not kept.
    async fn store_filled(
        &self,
        key: &CacheKey,
        id: u64,
        value: StoredResult,
        dependencies: Vec<CacheDependency>,
        ttl: Duration,
    ) -> bool {
        let size_bytes = entry_size(key, &value, &dependencies);
        let mut shard = self.shard(key).lock().await;

        // A missing or foreign marker means a flight for other dependency
        // versions replaced this one.
        let invalidated = match shard.in_flight.remove(key) {
            Some(flight) if flight.id == id => flight.invalidated,
            Some(newer) => {
                shard.in_flight.insert(key.clone(), newer);
                true
            }
            None => true,
        };

        if invalidated {
            debug!(key = %key, "Discarding result invalidated during computation");
            return false;
        }
        if ttl.is_zero() {
            return false;
        }
        if size_bytes > self.inner.config.store.max_memory_bytes() {
            debug!(key = %key, size_bytes, "Result exceeds memory budget, not cached");
            return false;
        }

        let entry = CacheEntry {
            value,
            dependencies,
            expires_at: Instant::now() + ttl,
            size_bytes,
            last_access: self.tick(),
        };
        self.inner.entry_count.fetch_add(1, Ordering::AcqRel);
        self.inner.memory_bytes.fetch_add(size_bytes, Ordering::AcqRel);
        if let Some(old) = shard.entries.put(key.clone(), entry) {
            self.release(&old);
        }
        true
    }

    // =========================================================================
    // Eviction & Maintenance
    // =========================================================================

    fn over_budget(&self) -> bool {
        let store = &self.inner.config.store;
        self.len() > store.max_entries || self.memory_usage() > store.max_memory_bytes()
    }

    /// Evicts least-recently-used entries until both bounds hold.
    pub(crate) async fn enforce_bounds(&self) -> usize {
        let mut evicted = 0;
        while self.over_budget() {
            let mut oldest: Option<(u64, usize)> = None;
            for (idx, shard) in self.inner.shards.iter().enumerate() {
                let shard = shard.lock().await;
                if let Some((_, entry)) = shard.entries.peek_lru() {
                    if oldest.map_or(true, |(tick, _)| entry.last_access < tick) {
                        oldest = Some((entry.last_access, idx));
                    }
                }
            }

            let Some((_, idx)) = oldest else { break };
            let mut shard = self.inner.shards[idx].lock().await;
            if let Some((key, entry)) = shard.entries.pop_lru() {
                self.release(&entry);
                evicted += 1;
                debug!(key = %key, "Evicted least recently used entry");
            }
        }

        if evicted > 0 {
            Counters::add(&self.inner.counters.evictions, evicted as u64);
            debug!(evicted, entries = self.len(), bytes = self.memory_usage(), "Cache bounds enforced");
        }
        evicted
    }

    /// Removes every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        for shard in &self.inner.shards {
            let mut shard = shard.lock().await;
            let expired: Vec<CacheKey> = shard
                .entries
                .iter()
                .filter(|(_, entry)| entry.expires_at <= now)
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                if let Some(entry) = shard.entries.pop(&key) {
                    self.release(&entry);
                    purged += 1;
                }
            }
        }
        if purged > 0 {
            Counters::add(&self.inner.counters.expirations, purged as u64);
            debug!(purged, "Purged expired entries");
        }
        purged
    }

    /// Removes one key from memory and the external store.
    pub async fn invalidate_key(&self, key: &CacheKey) -> bool {
        let removed = {
            let mut shard = self.shard(key).lock().await;
            if let Some(flight) = shard.in_flight.get_mut(key) {
                flight.invalidated = true;
            }
            shard.entries.pop(key)
        };

        if let Some(external) = &self.inner.external {
            external.delete(key, &self.inner.counters).await;
        }

        match removed {
            Some(entry) => {
                self.release(&entry);
                Counters::bump(&self.inner.counters.invalidations);
                debug!(key = %key, "Invalidated key");
                true
            }
            None => false,
        }
    }

    /// Drops every in-memory entry. The external store is left untouched.
    pub async fn clear(&self) -> usize {
        let mut cleared = 0;
        for shard in &self.inner.shards {
            let mut shard = shard.lock().await;
            for flight in shard.in_flight.values_mut() {
                flight.invalidated = true;
            }
            while let Some((_, entry)) = shard.entries.pop_lru() {
                self.release(&entry);
                cleared += 1;
            }
        }
        info!(cleared, "Cache cleared");
        cleared
    }

    /// Spawns a task that purges expired entries every `interval`. The task
    /// ends on its own once every store handle is dropped.
    pub fn spawn_janitor(&self, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("Cache store dropped, janitor exiting");
                    break;
                };
                CacheStore { inner }.purge_expired().await;
            }
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn shard(&self, key: &CacheKey) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.inner.shards.len();
        &self.inner.shards[idx]
    }

    fn tick(&self) -> u64 {
        self.inner.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns an entry's share of the global totals.
    pub(crate) fn release(&self, entry: &CacheEntry) {
        self.inner.entry_count.fetch_sub(1, Ordering::AcqRel);
        self.inner.memory_bytes.fetch_sub(entry.size_bytes, Ordering::AcqRel);
    }
}

// =============================================================================
// Free Helpers
// =============================================================================

/// Waits for the fill task; a task that died leaves no in-flight marker behind.
async fn await_fill(store: Weak<StoreInner>, task: JoinHandle<Filled>, key: CacheKey, id: u64) -> Filled {
    match task.await {
        Ok(filled) => filled,
        Err(e) => {
            warn!(key = %key, error = %e, "Cache fill task failed");
            if let Some(inner) = store.upgrade() {
                let store = CacheStore { inner };
                let mut shard = store.shard(&key).lock().await;
                if shard.in_flight.get(&key).is_some_and(|flight| flight.id == id) {
                    shard.in_flight.remove(&key);
                }
            }
            Filled {
                result: CalculationResult::failed(CoreError::ComputationFailed(format!("cache fill failed: {}", e))),
                from_external: false,
            }
        }
    }
}

/// Runs `compute` on the blocking pool.
async fn run_compute<F>(compute: F) -> StoredResult
where
    F: FnOnce() -> StoredResult + Send + 'static,
{
    match tokio::task::spawn_blocking(compute).await {
        Ok(result) => result,
        Err(e) => {
            let reason = if e.is_panic() {
                "computation panicked"
            } else {
                "computation was cancelled"
            };
            warn!(error = %e, "{}", reason);
            CalculationResult::failed(CoreError::ComputationFailed(reason.to_string()))
        }
    }
}

fn entry_size(key: &CacheKey, value: &StoredResult, dependencies: &[CacheDependency]) -> usize {
    let value_bytes = serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0);
    let dependency_bytes: usize = dependencies
        .iter()
        .map(|dep| dep.identifier.len() + dep.version.as_ref().map_or(0, String::len))
        .sum();
    key.as_str().len() + value_bytes + dependency_bytes
}

pub(crate) fn to_stored<T: Serialize>(result: CalculationResult<T>) -> StoredResult {
    let metadata = result.metadata();
    let stored = match result.into_result() {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => CalculationResult::ok(value),
            Err(e) => CalculationResult::failed(CoreError::ComputationFailed(format!(
                "result serialization failed: {}",
                e
            ))),
        },
        Err(error) => CalculationResult::failed(error),
    };
    stored.with_metadata(metadata)
}

pub(crate) fn from_stored<T: DeserializeOwned>(result: StoredResult) -> CalculationResult<T> {
    let metadata = result.metadata();
    let typed = match result.into_result() {
        Ok(value) => match serde_json::from_value(value) {
            Ok(value) => CalculationResult::ok(value),
            Err(e) => CalculationResult::failed(CoreError::ComputationFailed(format!(
                "cached result has unexpected shape: {}",
                e
            ))),
        },
        Err(error) => CalculationResult::failed(error),
    };
    typed.with_metadata(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn store_with(max_entries: usize) -> CacheStore {
        let mut config = CacheConfig::default();
        config.store.max_entries = max_entries;
        config.store.shards = 4;
        CacheStore::in_memory(config).unwrap()
    }

    async fn compute_n(store: &CacheStore, n: u32, calls: &Arc<AtomicUsize>) -> CalculationResult<u32> {
        let calls = Arc::clone(calls);
        store
            .get_or_compute("test", "square", CacheCategory::Default, &n, vec![], move || {
                calls.fetch_add(1, Ordering::SeqCst);
                CalculationResult::ok(n * n)
            })
            .await
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = compute_n(&store, 3, &calls).await;
        assert_eq!(first.value(), Some(&9));
        assert!(!first.metadata().cache_hit);

        let second = compute_n(&store, 3, &calls).await;
        assert_eq!(second.value(), Some(&9));
        assert!(second.metadata().cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_failures_are_cached() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let result: CalculationResult<u32> = store
                .get_or_compute("test", "broken", CacheCategory::Default, "bad", vec![], move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    CalculationResult::failed(CoreError::NoItemsProvided)
                })
                .await;
            assert_eq!(result.error_code(), Some("NO_ITEMS_PROVIDED"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_compute_becomes_failure() {
        let store = store_with(10);
        let result: CalculationResult<u32> = store
            .get_or_compute("test", "panics", CacheCategory::Default, &1, vec![], || panic!("boom"))
            .await;
        assert_eq!(result.error_code(), Some("COMPUTATION_FAILED"));
        assert!(store.inner.shards.iter().all(|s| s.try_lock().unwrap().in_flight.is_empty()));
    }

    #[tokio::test]
    async fn test_entry_bound_evicts_least_recently_used() {
        let store = store_with(2);
        let calls = Arc::new(AtomicUsize::new(0));

        compute_n(&store, 1, &calls).await;
        compute_n(&store, 2, &calls).await;
        // Touch 1 so 2 becomes the oldest.
        assert!(compute_n(&store, 1, &calls).await.metadata().cache_hit);
        compute_n(&store, 3, &calls).await;

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 1);
        assert!(compute_n(&store, 1, &calls).await.metadata().cache_hit);
        assert!(!compute_n(&store, 2, &calls).await.metadata().cache_hit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));

        compute_n(&store, 4, &calls).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(compute_n(&store, 4, &calls).await.metadata().cache_hit);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!compute_n(&store, 4, &calls).await.metadata().cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_and_clear() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));
        compute_n(&store, 1, &calls).await;
        compute_n(&store, 2, &calls).await;

        assert_eq!(store.purge_expired().await, 0);
        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty());
        assert_eq!(store.memory_usage(), 0);

        compute_n(&store, 3, &calls).await;
        assert_eq!(store.clear().await, 1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_key() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));
        compute_n(&store, 5, &calls).await;

        let key = CacheKey::derive("test", "square", &5u32).unwrap();
        assert!(store.contains(&key).await);
        assert!(store.invalidate_key(&key).await);
        assert!(!store.invalidate_key(&key).await);
        assert!(!store.contains(&key).await);
    }

    #[tokio::test]
    async fn test_memory_accounting() {
        let store = store_with(10);
        let calls = Arc::new(AtomicUsize::new(0));
        compute_n(&store, 6, &calls).await;
        let used = store.memory_usage();
        assert!(used > 0);

        let key = CacheKey::derive("test", "square", &6u32).unwrap();
        store.invalidate_key(&key).await;
        assert_eq!(store.memory_usage(), 0);
    }
}
