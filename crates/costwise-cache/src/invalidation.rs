//! # Invalidation Engine
//!
//! Sweeps the store for entries whose dependencies match an
//! [`InvalidationRequest`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.dependencies ── len > max_dependencies? ──┐                   │
//! │            │ no                                     │ yes               │
//! │            ▼                                        ▼                   │
//! │       one batch                          chunks of batch_size           │
//! │            │                                        │                   │
//! │            └──────────────► for each batch ◄────────┘                   │
//! │                              for each shard (one lock at a time)       │
//! │                                remove entries where any_match()        │
//! │                                flag matching in-flight computations    │
//! │                                                                         │
//! │  then: delete removed keys from the external store (best effort)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each entry is removed atomically under its shard lock. Removals across
//! shards are not ordered with respect to concurrent readers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::dependency::{any_match, CacheDependency, InvalidationRequest};
use crate::key::CacheKey;
use crate::stats::Counters;
use crate::store::CacheStore;

/// What one invalidation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationOutcome {
    /// Entries removed from memory.
    pub evicted: usize,
    /// Sweeps performed.
    pub batches: usize,
    /// Correlates the log lines of this request.
    pub request_id: Uuid,
}

impl CacheStore {
    /// Removes every entry with a dependency matching any requested one.
    ///
    /// Returns zero evictions when invalidation is disabled in configuration
    /// or the request names no dependencies.
    #[instrument(skip(self, request), fields(reason = %request.reason, dependencies = request.dependencies.len()))]
    pub async fn invalidate_by_dependencies(&self, request: &InvalidationRequest) -> InvalidationOutcome {
        let request_id = Uuid::new_v4();
        let settings = &self.inner.config.invalidation;

        if !settings.enabled {
            debug!(%request_id, "Invalidation disabled, ignoring request");
            return InvalidationOutcome {
                evicted: 0,
                batches: 0,
                request_id,
            };
        }

        let batches: Vec<&[CacheDependency]> = if request.dependencies.is_empty() {
            Vec::new()
        } else if request.dependencies.len() > settings.max_dependencies {
            request.dependencies.chunks(settings.batch_size).collect()
        } else {
            vec![request.dependencies.as_slice()]
        };

        let mut removed: Vec<CacheKey> = Vec::new();
        for batch in &batches {
            removed.extend(self.sweep(batch).await);
        }

        if let Some(external) = &self.inner.external {
            for key in &removed {
                external.delete(key, &self.inner.counters).await;
            }
        }

        let evicted = removed.len();
        Counters::add(&self.inner.counters.invalidations, evicted as u64);
        info!(
            %request_id,
            evicted,
            batches = batches.len(),
            user_id = request.user_id.as_deref().unwrap_or("-"),
            "Invalidation applied"
        );

        InvalidationOutcome {
            evicted,
            batches: batches.len(),
            request_id,
        }
    }

    /// One pass over all shards for a batch of dependencies.
    async fn sweep(&self, batch: &[CacheDependency]) -> Vec<CacheKey> {
        let mut removed = Vec::new();
        for shard in &self.inner.shards {
            let mut shard = shard.lock().await;

            for flight in shard.in_flight.values_mut() {
                if any_match(&flight.dependencies, batch) {
                    flight.invalidated = true;
                }
            }

            let matching: Vec<CacheKey> = shard
                .entries
                .iter()
                .filter(|(_, entry)| any_match(&entry.dependencies, batch))
                .map(|(key, _)| key.clone())
                .collect();

            for key in matching {
                if let Some(entry) = shard.entries.pop(&key) {
                    self.release(&entry);
                    debug!(key = %key, "Invalidated entry");
                    removed.push(key);
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheCategory, CacheConfig};
    use costwise_core::CalculationResult;

    async fn seed(store: &CacheStore, id: u32, deps: Vec<CacheDependency>) {
        let _: CalculationResult<u32> = store
            .get_or_compute("test", "seed", CacheCategory::Default, &id, deps, move || CalculationResult::ok(id))
            .await;
    }

    fn store(config: CacheConfig) -> CacheStore {
        CacheStore::in_memory(config).unwrap()
    }

    #[tokio::test]
    async fn test_or_matching_across_entries() {
        let store = store(CacheConfig::default());
        seed(&store, 1, vec![CacheDependency::inventory_item("1")]).await;
        seed(&store, 2, vec![CacheDependency::inventory_item("2"), CacheDependency::field("costing_method")]).await;
        seed(&store, 3, vec![CacheDependency::table("vendors")]).await;

        let outcome = store
            .invalidate_by_dependencies(&InvalidationRequest::costing_method_changed())
            .await;
        assert_eq!(outcome.evicted, 1);
        assert_eq!(outcome.batches, 1);
        assert_eq!(store.len(), 2);

        let outcome = store
            .invalidate_by_dependencies(&InvalidationRequest::new(
                vec![CacheDependency::inventory_item("1"), CacheDependency::table("vendors")],
                "bulk import",
            ))
            .await;
        assert_eq!(outcome.evicted, 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().invalidations, 3);
    }

    #[tokio::test]
    async fn test_version_must_agree_when_both_present() {
        let store = store(CacheConfig::default());
        seed(&store, 1, vec![CacheDependency::inventory_item("1").with_version("5")]).await;

        let miss = InvalidationRequest::new(vec![CacheDependency::inventory_item("1").with_version("4")], "old");
        assert_eq!(store.invalidate_by_dependencies(&miss).await.evicted, 0);

        let hit = InvalidationRequest::new(vec![CacheDependency::inventory_item("1").with_version("5")], "exact");
        assert_eq!(store.invalidate_by_dependencies(&hit).await.evicted, 1);
    }

    #[tokio::test]
    async fn test_large_requests_are_batched() {
        let mut config = CacheConfig::default();
        config.invalidation.max_dependencies = 4;
        config.invalidation.batch_size = 3;
        let store = store(config);

        seed(&store, 9, vec![CacheDependency::inventory_item("9")]).await;
        let deps: Vec<_> = (0..10).map(|i| CacheDependency::inventory_item(&i.to_string())).collect();

        let outcome = store
            .invalidate_by_dependencies(&InvalidationRequest::new(deps, "recount"))
            .await;
        assert_eq!(outcome.batches, 4);
        assert_eq!(outcome.evicted, 1);
    }

    #[tokio::test]
    async fn test_disabled_invalidation_is_a_no_op() {
        let mut config = CacheConfig::default();
        config.invalidation.enabled = false;
        let store = store(config);
        seed(&store, 1, vec![CacheDependency::inventory_item("1")]).await;

        let outcome = store
            .invalidate_by_dependencies(&InvalidationRequest::stock_changed("1"))
            .await;
        assert_eq!(outcome.evicted, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_request() {
        let store = store(CacheConfig::default());
        seed(&store, 1, vec![CacheDependency::inventory_item("1")]).await;
        let outcome = store
            .invalidate_by_dependencies(&InvalidationRequest::new(vec![], "nothing"))
            .await;
        assert_eq!((outcome.evicted, outcome.batches), (0, 0));
    }
}
