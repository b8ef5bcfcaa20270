//! # Cached Operations
//!
//! Binds every costing operation to its calculator, operation name and
//! dependency set.
//!
//! ## Operation Table
//! ```text
//! ┌──────────────────────────┬─────────────┬──────────────────────────────────────┐
//! │ operation                │ calculator  │ dependencies                         │
//! ├──────────────────────────┼─────────────┼──────────────────────────────────────┤
//! │ stock_valuation          │ valuation   │ entity:inventory_item:<id>@on_hand   │
//! │                          │             │ field:costing_method                 │
//! │                          │             │ entity:inventory_transactions:<id>   │
//! │                          │             │   @receipt count                     │
//! │ inventory_turnover       │ valuation   │ table:inventory_transactions         │
//! │ days_sales_inventory     │             │ table:inventory_items                │
//! │ carrying_cost            │ valuation   │ table:inventory_items                │
//! │ available_quantity       │ inventory   │ entity:inventory_item:<id>@on_hand   │
//! │ reorder_point            │ inventory   │ entity:inventory_item:<id>           │
//! │                          │             │ entity:inventory_transactions:<id>   │
//! │ economic_order_quantity  │ inventory   │ entity:inventory_item:<id>           │
//! │ abc_analysis             │ inventory   │ table:inventory_items                │
//! │                          │             │ table:inventory_transactions         │
//! └──────────────────────────┴─────────────┴──────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use costwise_core::costing::*;
use costwise_core::{CalculationResult, InventoryCalculator, ValuationCalculator};

use crate::cached::{CachedCalculator, CachedOperation, Calculator};
use crate::config::CacheCategory;
use crate::dependency::{
    CacheDependency, COSTING_METHOD_FIELD, INVENTORY_ITEMS_TABLE, INVENTORY_TRANSACTIONS_TABLE,
};

fn quantity_version(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

// =============================================================================
// Calculators
// =============================================================================

impl Calculator for ValuationCalculator {
    fn name(&self) -> &'static str {
        ValuationCalculator::NAME
    }

    fn category(&self) -> CacheCategory {
        CacheCategory::Financial
    }
}

impl Calculator for InventoryCalculator {
    fn name(&self) -> &'static str {
        InventoryCalculator::NAME
    }

    fn category(&self) -> CacheCategory {
        CacheCategory::Inventory
    }
}

// =============================================================================
// Valuation Operations
// =============================================================================

impl CachedOperation for StockValuationInput {
    type Calculator = ValuationCalculator;
    type Output = StockValuationResult;
    const OPERATION: &'static str = "stock_valuation";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![
            CacheDependency::inventory_item(&self.item_id).with_version(quantity_version(self.quantity_on_hand)),
            CacheDependency::field(COSTING_METHOD_FIELD),
            CacheDependency::inventory_transactions(&self.item_id).with_version(self.receipt_count()),
        ]
    }

    fn compute(&self, calculator: &ValuationCalculator) -> CalculationResult<StockValuationResult> {
        calculator.stock_valuation(self)
    }
}

impl CachedOperation for InventoryTurnoverInput {
    type Calculator = ValuationCalculator;
    type Output = InventoryTurnoverResult;
    const OPERATION: &'static str = "inventory_turnover";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![
            CacheDependency::table(INVENTORY_TRANSACTIONS_TABLE),
            CacheDependency::table(INVENTORY_ITEMS_TABLE),
        ]
    }

    fn compute(&self, calculator: &ValuationCalculator) -> CalculationResult<InventoryTurnoverResult> {
        calculator.inventory_turnover(self)
    }
}

impl CachedOperation for DaysSalesInventoryInput {
    type Calculator = ValuationCalculator;
    type Output = DaysSalesInventoryResult;
    const OPERATION: &'static str = "days_sales_inventory";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![
            CacheDependency::table(INVENTORY_TRANSACTIONS_TABLE),
            CacheDependency::table(INVENTORY_ITEMS_TABLE),
        ]
    }

    fn compute(&self, calculator: &ValuationCalculator) -> CalculationResult<DaysSalesInventoryResult> {
        calculator.days_sales_inventory(self)
    }
}

impl CachedOperation for CarryingCostInput {
    type Calculator = ValuationCalculator;
    type Output = CarryingCostResult;
    const OPERATION: &'static str = "carrying_cost";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![CacheDependency::table(INVENTORY_ITEMS_TABLE)]
    }

    fn compute(&self, calculator: &ValuationCalculator) -> CalculationResult<CarryingCostResult> {
        calculator.carrying_cost(self)
    }
}

// =============================================================================
// Inventory Operations
// =============================================================================

impl CachedOperation for AvailableQuantityInput {
    type Calculator = InventoryCalculator;
    type Output = AvailableQuantityResult;
    const OPERATION: &'static str = "available_quantity";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![CacheDependency::inventory_item(&self.item_id).with_version(quantity_version(self.quantity_on_hand))]
    }

    fn compute(&self, calculator: &InventoryCalculator) -> CalculationResult<AvailableQuantityResult> {
        calculator.available_quantity(self)
    }
}

impl CachedOperation for ReorderPointInput {
    type Calculator = InventoryCalculator;
    type Output = ReorderPointResult;
    const OPERATION: &'static str = "reorder_point";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![
            CacheDependency::inventory_item(&self.item_id),
            CacheDependency::inventory_transactions(&self.item_id),
        ]
    }

    fn compute(&self, calculator: &InventoryCalculator) -> CalculationResult<ReorderPointResult> {
        calculator.reorder_point(self)
    }
}

impl CachedOperation for EconomicOrderQuantityInput {
    type Calculator = InventoryCalculator;
    type Output = EconomicOrderQuantityResult;
    const OPERATION: &'static str = "economic_order_quantity";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![CacheDependency::inventory_item(&self.item_id)]
    }

    fn compute(&self, calculator: &InventoryCalculator) -> CalculationResult<EconomicOrderQuantityResult> {
        calculator.economic_order_quantity(self)
    }
}

impl CachedOperation for AbcAnalysisInput {
    type Calculator = InventoryCalculator;
    type Output = AbcAnalysisResult;
    const OPERATION: &'static str = "abc_analysis";

    fn dependencies(&self) -> Vec<CacheDependency> {
        vec![
            CacheDependency::table(INVENTORY_ITEMS_TABLE),
            CacheDependency::table(INVENTORY_TRANSACTIONS_TABLE),
        ]
    }

    fn compute(&self, calculator: &InventoryCalculator) -> CalculationResult<AbcAnalysisResult> {
        calculator.abc_analysis(self)
    }
}

// =============================================================================
// Named Entry Points
// =============================================================================

impl CachedCalculator<ValuationCalculator> {
    pub async fn stock_valuation(&self, input: &StockValuationInput) -> CalculationResult<StockValuationResult> {
        self.execute(input).await
    }

    pub async fn inventory_turnover(&self, input: &InventoryTurnoverInput) -> CalculationResult<InventoryTurnoverResult> {
        self.execute(input).await
    }

    pub async fn days_sales_inventory(
        &self,
        input: &DaysSalesInventoryInput,
    ) -> CalculationResult<DaysSalesInventoryResult> {
        self.execute(input).await
    }

    pub async fn carrying_cost(&self, input: &CarryingCostInput) -> CalculationResult<CarryingCostResult> {
        self.execute(input).await
    }
}

impl CachedCalculator<InventoryCalculator> {
    pub async fn available_quantity(&self, input: &AvailableQuantityInput) -> CalculationResult<AvailableQuantityResult> {
        self.execute(input).await
    }

    pub async fn reorder_point(&self, input: &ReorderPointInput) -> CalculationResult<ReorderPointResult> {
        self.execute(input).await
    }

    pub async fn economic_order_quantity(
        &self,
        input: &EconomicOrderQuantityInput,
    ) -> CalculationResult<EconomicOrderQuantityResult> {
        self.execute(input).await
    }

    pub async fn abc_analysis(&self, input: &AbcAnalysisInput) -> CalculationResult<AbcAnalysisResult> {
        self.execute(input).await
    }
}
