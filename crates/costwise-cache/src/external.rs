//! # External Store
//!
//! Optional shared backing store behind the in-memory cache.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    External Store Call Path                             │
//! │                                                                         │
//! │  CacheStore ──► ExternalTier ──timeout──► dyn ExternalStore (redis)     │
//! │                      │                                                  │
//! │                      ├─ Ok(v)          → v                              │
//! │                      ├─ Err(_)         → warn!, count, memory only      │
//! │                      └─ timeout        → warn!, count, memory only      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads are JSON [`ExternalRecord`]s carrying the result, the dependency
//! set and an absolute expiry, so a record read back from the store never
//! outlives the TTL it was written with.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use costwise_core::CalculationResult;

use crate::config::ExternalStoreSettings;
use crate::dependency::{any_stale, CacheDependency};
use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use crate::stats::Counters;

// =============================================================================
// External Store Trait
// =============================================================================

/// A networked key-value store with per-key expiry.
///
/// Implementations do not need to enforce timeouts; the cache bounds every
/// call with `external_store.connection_timeout_ms`.
#[async_trait]
pub trait ExternalStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn ping(&self) -> CacheResult<()>;
}

// =============================================================================
// Redis Store
// =============================================================================

/// [`ExternalStore`] over a redis connection manager.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Opens a managed connection, bounded by the configured timeout.
    pub async fn connect(settings: &ExternalStoreSettings) -> CacheResult<Self> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| CacheError::InvalidConfig("external_store.url is not set".into()))?;

        let client = redis::Client::open(url)?;
        let timeout = settings.connection_timeout();
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout(timeout.as_millis() as u64))??;

        info!("Connected to redis external store");
        Ok(RedisStore { connection })
    }
}

#[async_trait]
impl ExternalStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let millis = ttl.as_millis().clamp(1, u64::MAX as u128) as u64;
        conn.pset_ex::<_, _, ()>(key, value, millis).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

// =============================================================================
// Stored Record
// =============================================================================

/// What the cache writes to the external store for one key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExternalRecord {
    pub value: CalculationResult<Value>,
    pub dependencies: Vec<CacheDependency>,
    pub expires_at: DateTime<Utc>,
}

impl ExternalRecord {
    /// Time left before expiry, `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        (self.expires_at - Utc::now())
            .to_std()
            .ok()
            .filter(|left| !left.is_zero())
    }

    /// Unexpired and not outdated by the caller's current dependencies.
    pub fn usable_for(&self, current: &[CacheDependency]) -> Option<Duration> {
        if any_stale(&self.dependencies, current) {
            return None;
        }
        self.remaining()
    }
}

// =============================================================================
// External Tier
// =============================================================================

/// Timeout and failure handling around an [`ExternalStore`].
pub(crate) struct ExternalTier {
    store: Arc<dyn ExternalStore>,
    timeout: Duration,
    prefix: String,
}

impl ExternalTier {
    pub fn new(store: Arc<dyn ExternalStore>, settings: &ExternalStoreSettings) -> Self {
        ExternalTier {
            store,
            timeout: settings.connection_timeout(),
            prefix: settings.key_prefix.clone(),
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    fn degraded(&self, counters: &Counters, operation: &'static str, key: &str, err: &CacheError) {
        Counters::bump(&counters.external_errors);
        warn!(operation, key, error = %err, "External store call failed, continuing memory-only");
    }

    pub async fn ping(&self) -> CacheResult<()> {
        self.bounded(self.store.ping()).await
    }

    /// Reads a record; errors and undecodable payloads read as a miss.
    pub async fn get(&self, key: &CacheKey, counters: &Counters) -> Option<ExternalRecord> {
        let external_key = key.external(&self.prefix);
        match self.bounded(self.store.get(&external_key)).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(record) => Some(record),
                Err(e) => {
                    self.degraded(counters, "decode", &external_key, &CacheError::from(e));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.degraded(counters, "get", &external_key, &e);
                None
            }
        }
    }

    pub async fn put(
        &self,
        key: &CacheKey,
        value: &CalculationResult<Value>,
        dependencies: &[CacheDependency],
        ttl: Duration,
        counters: &Counters,
    ) {
        let external_key = key.external(&self.prefix);
        let expires_at = match chrono::Duration::from_std(ttl) {
            Ok(delta) => Utc::now() + delta,
            Err(_) => return,
        };
        let record = ExternalRecord {
            value: value.clone(),
            dependencies: dependencies.to_vec(),
            expires_at,
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                self.degraded(counters, "encode", &external_key, &CacheError::from(e));
                return;
            }
        };
        match self.bounded(self.store.set_with_ttl(&external_key, payload, ttl)).await {
            Ok(()) => debug!(key = %external_key, "Wrote entry to external store"),
            Err(e) => self.degraded(counters, "set", &external_key, &e),
        }
    }

    pub async fn delete(&self, key: &CacheKey, counters: &Counters) {
        let external_key = key.external(&self.prefix);
        if let Err(e) = self.bounded(self.store.delete(&external_key)).await {
            self.degraded(counters, "delete", &external_key, &e);
        }
    }
}
