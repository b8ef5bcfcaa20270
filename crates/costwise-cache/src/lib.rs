//! # costwise-cache: Computation Cache
//!
//! Memoizes costwise-core calculators with dependency-based invalidation.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         costwise-cache                                  │
//! │                                                                         │
//! │   upstream request           upstream mutation         scheduled job    │
//! │          │                          │                        │          │
//! │          ▼                          ▼                        ▼          │
//! │  ┌────────────────┐   ┌─────────────────────────┐   ┌──────────────┐   │
//! │  │CachedCalculator│   │invalidate_by_dependencies│   │ CacheWarmer  │   │
//! │  └───────┬────────┘   └────────────┬────────────┘   └──────┬───────┘   │
//! │          │ key + deps              │ sweep                 │           │
//! │          ▼                         ▼                       ▼           │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         CacheStore                              │   │
//! │  │   shards: Mutex<LRU + in-flight map>   TTL tiers   bounds       │   │
//! │  └───────────────────────────────┬─────────────────────────────────┘   │
//! │                                  │ optional, timeout bounded            │
//! │                                  ▼                                      │
//! │                         ExternalStore (redis)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - `CacheConfig` (TOML + env) and TTL categories
//! - [`key`] - Cache key derivation and canonicalization
//! - [`dependency`] - Dependencies and invalidation requests
//! - [`store`] - The sharded store with singleflight
//! - [`invalidation`] - Dependency sweeps
//! - [`warmer`] - Priority-ordered pre-population
//! - [`cached`] - `CachedCalculator` composition
//! - [`operations`] - Cached bindings for every costing operation
//! - [`external`] - External store trait and redis adapter
//! - [`stats`] - Counters
//! - [`error`] - Cache error types
//!
//! ## Example Usage
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use costwise_cache::{CacheConfig, CacheStore, CachedCalculator, InvalidationRequest};
//! use costwise_core::costing::AvailableQuantityInput;
//! use costwise_core::InventoryCalculator;
//! use rust_decimal::Decimal;
//!
//! let store = CacheStore::in_memory(CacheConfig::default()).unwrap();
//! let inventory = CachedCalculator::new(InventoryCalculator, store.clone());
//!
//! let input = AvailableQuantityInput::new("42", Decimal::from(10), Decimal::from(3));
//! assert!(!inventory.available_quantity(&input).await.metadata().cache_hit);
//! assert!(inventory.available_quantity(&input).await.metadata().cache_hit);
//!
//! store.invalidate_by_dependencies(&InvalidationRequest::stock_changed("42")).await;
//! assert!(!inventory.available_quantity(&input).await.metadata().cache_hit);
//! # });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cached;
pub mod config;
pub mod dependency;
pub mod error;
pub mod external;
pub mod invalidation;
pub mod key;
pub mod operations;
pub mod stats;
pub mod store;
pub mod warmer;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cached::{CachedCalculator, CachedOperation, Calculator};
pub use config::{CacheCategory, CacheConfig};
pub use dependency::{CacheDependency, DependencyKind, InvalidationRequest};
pub use error::{CacheError, CacheResult};
pub use external::{ExternalStore, RedisStore};
pub use invalidation::InvalidationOutcome;
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use warmer::{CacheWarmer, WarmingReport, WarmingTask};
