//! # Calculators
//!
//! Two stateless façades over the costing functions. Each method times the
//! call and folds the outcome into a [`CalculationResult`].
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ ValuationCalculator          │   │ InventoryCalculator          │
//! │ ("valuation", financial TTL) │   │ ("inventory", inventory TTL) │
//! │  stock_valuation             │   │  available_quantity          │
//! │  inventory_turnover          │   │  reorder_point               │
//! │  days_sales_inventory        │   │  economic_order_quantity     │
//! │  carrying_cost               │   │  abc_analysis                │
//! └──────────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Both are zero-sized and `Copy`; construct them wherever they are needed.

use std::time::Instant;

use crate::costing::*;
use crate::error::CoreResult;
use crate::result::CalculationResult;

fn timed<T>(f: impl FnOnce() -> CoreResult<T>) -> CalculationResult<T> {
    let started = Instant::now();
    CalculationResult::from(f()).with_timing(started.elapsed(), false)
}

// =============================================================================
// Valuation Calculator
// =============================================================================

/// Financial valuations of stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuationCalculator;

impl ValuationCalculator {
    /// Identity used in cache keys.
    pub const NAME: &'static str = "valuation";

    pub fn stock_valuation(&self, input: &StockValuationInput) -> CalculationResult<StockValuationResult> {
        timed(|| calculate_stock_valuation(input))
    }

    pub fn inventory_turnover(&self, input: &InventoryTurnoverInput) -> CalculationResult<InventoryTurnoverResult> {
        timed(|| calculate_inventory_turnover(input))
    }

    pub fn days_sales_inventory(
        &self,
        input: &DaysSalesInventoryInput,
    ) -> CalculationResult<DaysSalesInventoryResult> {
        timed(|| calculate_days_sales_inventory(input))
    }

    pub fn carrying_cost(&self, input: &CarryingCostInput) -> CalculationResult<CarryingCostResult> {
        timed(|| calculate_carrying_cost(input))
    }
}

// =============================================================================
// Inventory Calculator
// =============================================================================

/// Quantity planning and classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryCalculator;

impl InventoryCalculator {
    /// Identity used in cache keys.
    pub const NAME: &'static str = "inventory";

    pub fn available_quantity(&self, input: &AvailableQuantityInput) -> CalculationResult<AvailableQuantityResult> {
        timed(|| calculate_available_quantity(input))
    }

    pub fn reorder_point(&self, input: &ReorderPointInput) -> CalculationResult<ReorderPointResult> {
        timed(|| calculate_reorder_point(input))
    }

    pub fn economic_order_quantity(
        &self,
        input: &EconomicOrderQuantityInput,
    ) -> CalculationResult<EconomicOrderQuantityResult> {
        timed(|| calculate_economic_order_quantity(input))
    }

    pub fn abc_analysis(&self, input: &AbcAnalysisInput) -> CalculationResult<AbcAnalysisResult> {
        timed(|| perform_abc_analysis(input))
    }
}
