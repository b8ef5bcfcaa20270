//! End-to-end behavior of cached calculators over an in-memory store.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use costwise_cache::{
    CacheCategory, CacheConfig, CacheDependency, CacheStore, CacheWarmer, CachedCalculator, InvalidationRequest,
};
use costwise_core::costing::{
    AbcAnalysisInput, AbcItem, AvailableQuantityInput, CarryingCostInput, EconomicOrderQuantityInput,
};
use costwise_core::{CalculationResult, Currency, InventoryCalculator, Money, ValuationCalculator};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{memory_store, usd, valuation_input};

fn counted(calls: &Arc<AtomicUsize>, value: u64) -> impl FnOnce() -> CalculationResult<u64> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        CalculationResult::ok(value)
    }
}

// =============================================================================
// Hits, Misses & Invalidation
// =============================================================================

#[tokio::test]
async fn repeated_valuation_is_served_from_cache() {
    let valuation = CachedCalculator::new(ValuationCalculator, memory_store());
    let input = valuation_input("42", dec!(5));

    let first = valuation.stock_valuation(&input).await;
    let second = valuation.stock_valuation(&input).await;

    assert!(first.is_success());
    assert!(!first.metadata().cache_hit);
    assert!(second.metadata().cache_hit);
    assert_eq!(first.value(), second.value());
    assert_eq!(second.value().unwrap().total_value.amount(), dec!(30));

    let stats = valuation.store().stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn stock_change_forces_recomputation() {
    let valuation = CachedCalculator::new(ValuationCalculator, memory_store());
    let other = valuation_input("7", dec!(1));
    let input = valuation_input("42", dec!(5));

    valuation.stock_valuation(&input).await;
    valuation.stock_valuation(&other).await;

    let outcome = valuation
        .store()
        .invalidate_by_dependencies(&InvalidationRequest::stock_changed("42"))
        .await;
    assert_eq!(outcome.evicted, 1);

    assert!(!valuation.stock_valuation(&input).await.metadata().cache_hit);
    assert!(valuation.stock_valuation(&other).await.metadata().cache_hit);
}

#[tokio::test]
async fn changed_dependency_version_is_a_miss() {
    let store = memory_store();
    let calls = Arc::new(AtomicUsize::new(0));
    let deps = |version: &str| vec![CacheDependency::inventory_item("42").with_version(version)];

    store
        .get_or_compute("inventory", "probe", CacheCategory::Inventory, &"42", deps("5"), counted(&calls, 1))
        .await;
    let same = store
        .get_or_compute("inventory", "probe", CacheCategory::Inventory, &"42", deps("5"), counted(&calls, 2))
        .await;
    let bumped = store
        .get_or_compute("inventory", "probe", CacheCategory::Inventory, &"42", deps("6"), counted(&calls, 3))
        .await;

    assert_eq!(same.value(), Some(&1));
    assert!(!bumped.metadata().cache_hit);
    assert_eq!(bumped.value(), Some(&3));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn validation_failures_are_cached() {
    let valuation = CachedCalculator::new(ValuationCalculator, memory_store());
    let eur = Currency::new("EUR").unwrap();
    let input = CarryingCostInput::new(usd(dec!(1000)), dec!(0.25)).with_fixed_storage_cost(Money::new(dec!(50), eur));

    let first = valuation.carrying_cost(&input).await;
    let second = valuation.carrying_cost(&input).await;

    assert_eq!(first.error_code(), Some("CURRENCY_MISMATCH"));
    assert_eq!(second.error_code(), Some("CURRENCY_MISMATCH"));
    assert!(second.metadata().cache_hit);
}

#[tokio::test]
async fn trailing_zeros_in_quantities_hit_the_same_entry() {
    let inventory = CachedCalculator::new(InventoryCalculator, memory_store());

    let first = inventory
        .available_quantity(&AvailableQuantityInput::new("42", dec!(10), dec!(4)))
        .await;
    let second = inventory
        .available_quantity(&AvailableQuantityInput::new("42", dec!(10.00), dec!(4.0)))
        .await;

    assert!(!first.metadata().cache_hit);
    assert!(second.metadata().cache_hit);
    assert_eq!(second.value().unwrap().quantity_available, dec!(6));
}

#[tokio::test]
async fn oversized_inputs_return_a_cached_error() {
    let inventory = CachedCalculator::new(InventoryCalculator, memory_store());
    let input = EconomicOrderQuantityInput {
        item_id: "42".to_string(),
        annual_demand: Decimal::MAX,
        ordering_cost: usd(dec!(1000000)),
        holding_cost_per_unit: usd(dec!(1)),
    };

    let first = inventory.economic_order_quantity(&input).await;
    let second = inventory.economic_order_quantity(&input).await;

    assert_eq!(first.error_code(), Some("VALIDATION_ERROR"));
    assert!(second.metadata().cache_hit);
}

#[tokio::test]
async fn forget_drops_a_single_entry() {
    let inventory = CachedCalculator::new(InventoryCalculator, memory_store());
    let input = AvailableQuantityInput::new("42", dec!(10), dec!(4));

    inventory.available_quantity(&input).await;
    assert!(inventory.forget(&input).await);
    assert!(!inventory.forget(&input).await);
    assert!(!inventory.available_quantity(&input).await.metadata().cache_hit);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_computation() {
    let store = memory_store();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            store
                .get_or_compute("valuation", "slow", CacheCategory::Financial, &"item-1", vec![], move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(50));
                    CalculationResult::ok(99u64)
                })
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.value(), Some(&99));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = store.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits + stats.coalesced, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_leader_does_not_strand_followers() {
    let store = memory_store();
    let calls = Arc::new(AtomicUsize::new(0));

    let slow = |calls: Arc<AtomicUsize>| {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            CalculationResult::ok(5u64)
        }
    };

    let leader = {
        let store = store.clone();
        let compute = slow(Arc::clone(&calls));
        tokio::spawn(async move {
            store
                .get_or_compute("inventory", "slow", CacheCategory::Inventory, &1, vec![], compute)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let follower = {
        let store = store.clone();
        let compute = slow(Arc::clone(&calls));
        tokio::spawn(async move {
            store
                .get_or_compute("inventory", "slow", CacheCategory::Inventory, &1, vec![], compute)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    leader.abort();

    let result = follower.await.unwrap();
    assert_eq!(result.value(), Some(&5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.stats().coalesced, 1);
    assert!(store.contains(&costwise_cache::CacheKey::derive("inventory", "slow", &1).unwrap()).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn caller_with_newer_versions_does_not_join_stale_computation() {
    let store = memory_store();
    let calls = Arc::new(AtomicUsize::new(0));
    let deps = |version: &str| vec![CacheDependency::inventory_item("42").with_version(version)];

    let stale = {
        let store = store.clone();
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            store
                .get_or_compute("inventory", "on_hand", CacheCategory::Inventory, &"42", deps("5"), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(200));
                    CalculationResult::ok(5u64)
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fresh = store
        .get_or_compute("inventory", "on_hand", CacheCategory::Inventory, &"42", deps("6"), counted(&calls, 6))
        .await;
    assert_eq!(fresh.value(), Some(&6));
    assert_eq!(stale.await.unwrap().value(), Some(&5));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.stats().coalesced, 0);

    // Only the result computed for the current versions was kept.
    let again = store
        .get_or_compute("inventory", "on_hand", CacheCategory::Inventory, &"42", deps("6"), counted(&calls, 7))
        .await;
    assert!(again.metadata().cache_hit);
    assert_eq!(again.value(), Some(&6));
}

// =============================================================================
// Expiry & Bounds
// =============================================================================

#[tokio::test(start_paused = true)]
async fn financial_results_expire_after_their_ttl() {
    let store = memory_store();
    let calls = Arc::new(AtomicUsize::new(0));

    store
        .get_or_compute("valuation", "ttl", CacheCategory::Financial, &1, vec![], counted(&calls, 1))
        .await;
    tokio::time::advance(Duration::from_secs(299)).await;
    let warm = store
        .get_or_compute("valuation", "ttl", CacheCategory::Financial, &1, vec![], counted(&calls, 2))
        .await;
    assert!(warm.metadata().cache_hit);

    tokio::time::advance(Duration::from_secs(2)).await;
    let cold = store
        .get_or_compute("valuation", "ttl", CacheCategory::Financial, &1, vec![], counted(&calls, 3))
        .await;
    assert!(!cold.metadata().cache_hit);
    assert_eq!(cold.value(), Some(&3));
    assert_eq!(store.stats().expirations, 1);
}

#[tokio::test]
async fn entry_bound_evicts_least_recently_used() {
    let mut config = CacheConfig::default();
    config.store.max_entries = 3;
    let store = CacheStore::in_memory(config).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    for id in 0..3u64 {
        store
            .get_or_compute("inventory", "bound", CacheCategory::Inventory, &id, vec![], counted(&calls, id))
            .await;
    }
    // Touch 0 so 1 becomes the oldest.
    store
        .get_or_compute("inventory", "bound", CacheCategory::Inventory, &0u64, vec![], counted(&calls, 0))
        .await;
    store
        .get_or_compute("inventory", "bound", CacheCategory::Inventory, &3u64, vec![], counted(&calls, 3))
        .await;

    assert_eq!(store.len(), 3);
    assert_eq!(store.stats().evictions, 1);
    let key = |id: u64| costwise_cache::CacheKey::derive("inventory", "bound", &id).unwrap();
    assert!(store.contains(&key(0)).await);
    assert!(!store.contains(&key(1)).await);
}

// =============================================================================
// Warming
// =============================================================================

#[tokio::test]
async fn warming_fills_cache_and_counts_failures() {
    let store = memory_store();
    let inventory = CachedCalculator::new(InventoryCalculator, store.clone());

    let first = AvailableQuantityInput::new("1", dec!(10), dec!(2));
    let second = AvailableQuantityInput::new("2", dec!(8), dec!(8));
    let abc = AbcAnalysisInput::new(vec![
        AbcItem::new("1", usd(dec!(9000)), dec!(100)),
        AbcItem::new("2", usd(dec!(1000)), dec!(50)),
    ]);

    let tasks = vec![
        inventory.warming_task(first.clone(), 10).unwrap(),
        inventory.warming_task(second.clone(), 5).unwrap(),
        inventory.warming_task(abc.clone(), 1).unwrap(),
        inventory.warming_task(AbcAnalysisInput::new(vec![]), 0).unwrap(),
    ];

    let report = CacheWarmer::new(store).warm(tasks).await;
    assert_eq!(report.warmed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped_cached, 0);

    assert!(inventory.available_quantity(&first).await.metadata().cache_hit);
    assert!(inventory.available_quantity(&second).await.metadata().cache_hit);
    assert!(inventory.abc_analysis(&abc).await.metadata().cache_hit);
}
