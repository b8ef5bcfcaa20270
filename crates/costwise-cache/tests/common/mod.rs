//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use costwise_cache::{CacheConfig, CacheError, CacheResult, CacheStore, ExternalStore};
use costwise_core::costing::StockValuationInput;
use costwise_core::{CostingMethod, Currency, InventoryTransaction, Money};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; `RUST_LOG=costwise_cache=debug` shows
/// cache decisions.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn memory_store() -> CacheStore {
    init_tracing();
    CacheStore::in_memory(CacheConfig::default()).unwrap()
}

pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// FIFO valuation input for `item_id` with two receipts (10 @ 5, 10 @ 7).
pub fn valuation_input(item_id: &str, on_hand: Decimal) -> StockValuationInput {
    let day = |d: u32| chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc();
    StockValuationInput::new(item_id, on_hand, CostingMethod::Fifo, Currency::USD).with_transactions(vec![
        InventoryTransaction::receive("t1", item_id, Decimal::from(10), usd(Decimal::from(5)), day(1)),
        InventoryTransaction::receive("t2", item_id, Decimal::from(10), usd(Decimal::from(7)), day(2)),
    ])
}

// =============================================================================
// Test External Stores
// =============================================================================

/// In-process external store shared between cache instances.
#[derive(Default)]
pub struct SharedMapStore {
    pub values: Mutex<HashMap<String, String>>,
    pub deletes: Mutex<Vec<String>>,
}

#[async_trait]
impl ExternalStore for SharedMapStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_with_ttl(&self, key: &str, value: String, _ttl: Duration) -> CacheResult<()> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.values.lock().unwrap().remove(key);
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Answers pings, fails every data command.
pub struct BrokenStore;

#[async_trait]
impl ExternalStore for BrokenStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::ExternalStoreUnavailable("connection reset".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::ExternalStoreUnavailable("connection reset".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::ExternalStoreUnavailable("connection reset".into()))
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Answers pings, hangs on every data command.
pub struct HangingStore;

#[async_trait]
impl ExternalStore for HangingStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Unreachable from the start.
pub struct DownStore;

#[async_trait]
impl ExternalStore for DownStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::ExternalStoreUnavailable("refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::ExternalStoreUnavailable("refused".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::ExternalStoreUnavailable("refused".into()))
    }

    async fn ping(&self) -> CacheResult<()> {
        Err(CacheError::ExternalStoreUnavailable("refused".into()))
    }
}
