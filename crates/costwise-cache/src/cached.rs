//! # Cached Calculators
//!
//! Composition of a pure calculator with a [`CacheStore`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CachedCalculator<C>                                                    │
//! │  ┌──────────────────┐   ┌──────────────────┐                            │
//! │  │ calculator: C    │   │ store: CacheStore│                            │
//! │  │  name()          │   │  get_or_compute  │                            │
//! │  │  category()      │   └──────────────────┘                            │
//! │  └──────────────────┘                                                   │
//! │                                                                         │
//! │  execute(&input)  where input: CachedOperation<Calculator = C>          │
//! │    key   = (C::name, Op::OPERATION, input)                              │
//! │    deps  = input.dependencies()                                         │
//! │    miss  → input.compute(&calculator)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each input type declares its operation name, dependency set and
//! computation once, in its `CachedOperation` impl. There is no subclassing
//! of calculators.

use serde::de::DeserializeOwned;
use serde::Serialize;

use costwise_core::CalculationResult;

use crate::config::CacheCategory;
use crate::dependency::CacheDependency;
use crate::error::CacheResult;
use crate::key::CacheKey;
use crate::store::CacheStore;
use crate::warmer::WarmingTask;

// =============================================================================
// Traits
// =============================================================================

/// A pure calculator that can sit behind the cache.
pub trait Calculator: Clone + Send + Sync + 'static {
    /// Stable identity used in cache keys.
    fn name(&self) -> &'static str;

    /// TTL tier for every result of this calculator.
    fn category(&self) -> CacheCategory;
}

/// An input record that knows which calculator operation it feeds.
pub trait CachedOperation: Serialize + Clone + Send + Sync + 'static {
    type Calculator: Calculator;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Operation name used in cache keys.
    const OPERATION: &'static str;

    /// Data the result of this input depends on.
    fn dependencies(&self) -> Vec<CacheDependency>;

    /// Runs the uncached computation.
    fn compute(&self, calculator: &Self::Calculator) -> CalculationResult<Self::Output>;
}

// =============================================================================
// Cached Calculator
// =============================================================================

/// A calculator whose operations go through a shared [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CachedCalculator<C: Calculator> {
    calculator: C,
    store: CacheStore,
}

impl<C: Calculator> CachedCalculator<C> {
    pub fn new(calculator: C, store: CacheStore) -> Self {
        CachedCalculator { calculator, store }
    }

    pub fn calculator(&self) -> &C {
        &self.calculator
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Runs `input` through the cache.
    pub async fn execute<Op>(&self, input: &Op) -> CalculationResult<Op::Output>
    where
        Op: CachedOperation<Calculator = C>,
    {
        let calculator = self.calculator.clone();
        let owned = input.clone();
        self.store
            .get_or_compute(
                self.calculator.name(),
                Op::OPERATION,
                self.calculator.category(),
                input,
                input.dependencies(),
                move || owned.compute(&calculator),
            )
            .await
    }

    /// Cache key `input` maps to.
    pub fn key_for<Op>(&self, input: &Op) -> CacheResult<CacheKey>
    where
        Op: CachedOperation<Calculator = C>,
    {
        CacheKey::derive(self.calculator.name(), Op::OPERATION, input)
    }

    /// Drops the cached result for `input`, if any.
    pub async fn forget<Op>(&self, input: &Op) -> bool
    where
        Op: CachedOperation<Calculator = C>,
    {
        match self.key_for(input) {
            Ok(key) => self.store.invalidate_key(&key).await,
            Err(_) => false,
        }
    }

    /// Warming task that fills the cache for `input`.
    pub fn warming_task<Op>(&self, input: Op, priority: i32) -> CacheResult<WarmingTask>
    where
        Op: CachedOperation<Calculator = C>,
    {
        let calculator = self.calculator.clone();
        let dependencies = input.dependencies();
        WarmingTask::new(
            self.calculator.name(),
            Op::OPERATION,
            self.calculator.category(),
            &input.clone(),
            dependencies,
            priority,
            move || input.compute(&calculator),
        )
    }
}
