//! # Cache Warmer
//!
//! Pre-populates the store with results callers are about to ask for.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tasks ──sort by priority (desc, stable)──► for each task               │
//! │                                              │                          │
//! │       already cached? ─ yes ─► skipped_cached, plus warmed or failed    │
//! │                                              │ no                       │
//! │                      acquire worker permit (bounded concurrency)        │
//! │                                              │                          │
//! │                      spawn get_or_compute ──► success → warmed          │
//! │                                               failure → failed          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Permits are taken in priority order, so higher-priority tasks always
//! start first. A failing task never stops the batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use costwise_core::CalculationResult;

use crate::config::CacheCategory;
use crate::dependency::CacheDependency;
use crate::error::CacheResult;
use crate::key::CacheKey;
use crate::store::{to_stored, CacheStore, StoredResult};

type BoxedCompute = Box<dyn FnOnce() -> StoredResult + Send>;

// =============================================================================
// Warming Task
// =============================================================================

/// One computation to pre-populate.
pub struct WarmingTask {
    pub calculator: String,
    pub operation: String,
    pub category: CacheCategory,
    pub input: Value,
    pub dependencies: Vec<CacheDependency>,
    /// Higher runs first.
    pub priority: i32,
    compute: BoxedCompute,
}

impl std::fmt::Debug for WarmingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmingTask")
            .field("calculator", &self.calculator)
            .field("operation", &self.operation)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl WarmingTask {
    /// Builds a task. Fails only if `input` cannot be serialized.
    pub fn new<I, T, F>(
        calculator: &str,
        operation: &str,
        category: CacheCategory,
        input: &I,
        dependencies: Vec<CacheDependency>,
        priority: i32,
        compute: F,
    ) -> CacheResult<Self>
    where
        I: Serialize + ?Sized,
        T: Serialize,
        F: FnOnce() -> CalculationResult<T> + Send + 'static,
    {
        Ok(WarmingTask {
            calculator: calculator.to_string(),
            operation: operation.to_string(),
            category,
            input: serde_json::to_value(input)?,
            dependencies,
            priority,
            compute: Box::new(move || to_stored(compute())),
        })
    }

    pub fn key(&self) -> CacheResult<CacheKey> {
        CacheKey::derive(&self.calculator, &self.operation, &self.input)
    }
}

/// Totals for one warming batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmingReport {
    /// Tasks whose key now holds a successful result.
    pub warmed: usize,
    /// Tasks whose key holds a failure, freshly computed or cached.
    pub failed: usize,
    /// Tasks already cached and not recomputed; each also counts toward
    /// `warmed` or `failed`.
    pub skipped_cached: usize,
}

// =============================================================================
// Cache Warmer
// =============================================================================

/// Runs warming batches against a store.
#[derive(Debug, Clone)]
pub struct CacheWarmer {
    store: CacheStore,
    concurrency: usize,
}

impl CacheWarmer {
    /// Warmer using `warming.concurrency` from the store's configuration.
    pub fn new(store: CacheStore) -> Self {
        let concurrency = store.config().warming.concurrency;
        CacheWarmer { store, concurrency }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Executes `tasks`, highest priority first, at most `concurrency` at once.
    #[instrument(skip_all, fields(tasks = tasks.len(), concurrency = self.concurrency))]
    pub async fn warm(&self, mut tasks: Vec<WarmingTask>) -> WarmingReport {
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority));

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut running = JoinSet::new();
        let mut report = WarmingReport::default();

        for task in tasks {
            let key = match task.key() {
                Ok(key) => key,
                Err(e) => {
                    warn!(operation = %task.operation, error = %e, "Warming task has no usable key");
                    report.failed += 1;
                    continue;
                }
            };

            if let Some(success) = self.store.cached_outcome(&key, &task.dependencies).await {
                debug!(key = %key, success, "Already cached, skipping");
                report.skipped_cached += 1;
                if success {
                    report.warmed += 1;
                } else {
                    report.failed += 1;
                }
                continue;
            }

            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let store = self.store.clone();
            running.spawn(async move {
                let _permit = permit;
                let result: CalculationResult<Value> = store
                    .get_or_compute(
                        &task.calculator,
                        &task.operation,
                        task.category,
                        &task.input,
                        task.dependencies,
                        task.compute,
                    )
                    .await;
                if !result.is_success() {
                    debug!(
                        key = %key,
                        code = result.error_code().unwrap_or("UNKNOWN"),
                        "Warming computation failed"
                    );
                }
                result.is_success()
            });
        }

        while let Some(joined) = running.join_next().await {
            match joined {
                Ok(true) => report.warmed += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    warn!(error = %e, "Warming worker aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            warmed = report.warmed,
            failed = report.failed,
            skipped_cached = report.skipped_cached,
            "Cache warming finished"
        );
        report
    }
}
