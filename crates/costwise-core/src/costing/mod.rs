//! # Costing Engine
//!
//! Pure, side-effect-free costing formulas.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  valuation        FIFO / LIFO / moving & weighted average / standard   │
//! │  availability     on-hand minus reservations (+ on order)               │
//! │  replenishment    reorder point, EOQ                                    │
//! │  classification   ABC analysis                                          │
//! │  metrics          turnover, days of supply, carrying cost               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function validates first and returns `CoreResult`; nothing here
//! panics on bad input. The [`crate::calculator`] façades fold these into
//! `CalculationResult` values.

pub mod availability;
pub mod classification;
pub mod metrics;
pub mod replenishment;
pub mod valuation;

pub use availability::{calculate_available_quantity, AvailableQuantityInput, AvailableQuantityResult};
pub use classification::{
    perform_abc_analysis, AbcAnalysisInput, AbcAnalysisResult, AbcClassSummary, AbcItem,
    AbcItemResult, AbcThresholds,
};
pub use metrics::{
    calculate_carrying_cost, calculate_days_sales_inventory, calculate_inventory_turnover,
    CarryingCostInput, CarryingCostResult, DaysSalesInventoryInput, DaysSalesInventoryResult,
    InventoryTurnoverInput, InventoryTurnoverResult,
};
pub use replenishment::{
    calculate_economic_order_quantity, calculate_reorder_point, EconomicOrderQuantityInput,
    EconomicOrderQuantityResult, ReorderPointInput, ReorderPointResult,
};
pub use valuation::{calculate_stock_valuation, StockValuationInput, StockValuationResult};
