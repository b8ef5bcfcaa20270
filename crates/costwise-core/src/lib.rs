//! # costwise-core: Pure Costing Engine
//!
//! Deterministic inventory and financial calculators with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Costwise Architecture                            │
//! │                                                                         │
//! │  Upstream services (request handlers, mutation pipelines)               │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             costwise-cache (CachedCalculator, CacheStore)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ on miss                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ costwise-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  costing  │  │calculator │  │ validation│  │   │
//! │  │   │   Money   │  │ valuation │  │ Valuation │  │   rules   │  │   │
//! │  │   │ Currency  │  │ ABC, EOQ  │  │ Inventory │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and Currency with exact decimal arithmetic
//! - [`types`] - Costing methods, transactions, ABC classes
//! - [`costing`] - The formulas
//! - [`calculator`] - Timed façades returning `CalculationResult`
//! - [`result`] - The `CalculationResult` envelope
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use costwise_core::{Currency, InventoryCalculator};
//! use costwise_core::costing::ReorderPointInput;
//! use rust_decimal::Decimal;
//!
//! let input = ReorderPointInput::new("42", Decimal::from(300), Decimal::from(14));
//! let result = InventoryCalculator.reorder_point(&input);
//!
//! let rop = result.value().unwrap();
//! assert_eq!(rop.reorder_point, 210);
//! assert_eq!(rop.recommended_order_quantity, 600);
//! # let _ = Currency::USD;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod costing;
pub mod error;
pub mod money;
pub mod result;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculator::{InventoryCalculator, ValuationCalculator};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Currency, Money};
pub use result::{CalculationError, CalculationMetadata, CalculationResult};
pub use types::*;
