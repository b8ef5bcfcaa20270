//! Cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that joined a computation already in flight.
    pub coalesced: u64,
    /// Entries dropped to satisfy the entry or memory bound.
    pub evictions: u64,
    pub expirations: u64,
    /// Entries removed by invalidation requests, explicit key removal or
    /// version mismatch on lookup.
    pub invalidations: u64,
    pub external_hits: u64,
    pub external_errors: u64,
    pub entries: u64,
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Memory and external hits over all lookups; 0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.external_hits;
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub coalesced: AtomicU64,
    pub evictions: AtomicU64,
    pub expirations: AtomicU64,
    pub invalidations: AtomicU64,
    pub external_hits: AtomicU64,
    pub external_errors: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entries: u64, memory_bytes: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            external_hits: self.external_hits.load(Ordering::Relaxed),
            external_errors: self.external_errors.load(Ordering::Relaxed),
            entries,
            memory_bytes,
        }
    }
}
