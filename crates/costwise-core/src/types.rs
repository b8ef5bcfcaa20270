//! # Domain Types
//!
//! Shared vocabulary for the costing engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │ InventoryTransaction│   │  CostingMethod  │   │    AbcClass     │   │
//! │  │  ─────────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  id                 │   │  FIFO           │   │  A (high)       │   │
//! │  │  item_id            │   │  LIFO           │   │  B (medium)     │   │
//! │  │  transaction_type   │   │  MOVING_AVERAGE │   │  C (low)        │   │
//! │  │  quantity           │   │  WEIGHTED_AVG   │   └─────────────────┘   │
//! │  │  unit_cost (Money?) │   │  STANDARD_COST  │                         │
//! │  │  transaction_date   │   └─────────────────┘                         │
//! │  └─────────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operation-specific inputs and results live next to their formulas in
//! [`crate::costing`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::{serialize_normalized, Money};

// =============================================================================
// Costing Method
// =============================================================================

/// How on-hand stock is assigned a unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostingMethod {
    /// First in, first out (weighted over receipt layers, see valuation).
    Fifo,
    /// Last in, first out (newest receipt cost).
    Lifo,
    /// Simple average of the most recent receipt costs.
    MovingAverage,
    /// Quantity-weighted average of every receipt.
    WeightedAverage,
    /// Externally maintained standard cost.
    StandardCost,
}

impl CostingMethod {
    /// Canonical upper-snake name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CostingMethod::Fifo => "FIFO",
            CostingMethod::Lifo => "LIFO",
            CostingMethod::MovingAverage => "MOVING_AVERAGE",
            CostingMethod::WeightedAverage => "WEIGHTED_AVERAGE",
            CostingMethod::StandardCost => "STANDARD_COST",
        }
    }
}

impl fmt::Display for CostingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostingMethod {
    type Err = CoreError;

    /// Accepts any case and `-` in place of `_` (`"moving-average"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "FIFO" => Ok(CostingMethod::Fifo),
            "LIFO" => Ok(CostingMethod::Lifo),
            "MOVING_AVERAGE" => Ok(CostingMethod::MovingAverage),
            "WEIGHTED_AVERAGE" => Ok(CostingMethod::WeightedAverage),
            "STANDARD_COST" => Ok(CostingMethod::StandardCost),
            _ => Err(CoreError::UnsupportedCostingMethod {
                method: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Inventory Transactions
// =============================================================================

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Goods received from a vendor; the only type that forms cost layers.
    Receive,
    /// Goods issued to production or sale.
    Issue,
    /// Cycle-count correction.
    Adjustment,
    /// Movement between locations.
    Transfer,
    /// Customer or vendor return.
    Return,
}

/// A stock movement, already fetched by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: String,
    pub item_id: String,
    pub transaction_type: TransactionType,
    #[serde(serialize_with = "serialize_normalized")]
    pub quantity: Decimal,
    /// Cost per unit; required on RECEIVE.
    #[serde(default)]
    pub unit_cost: Option<Money>,
    pub transaction_date: DateTime<Utc>,
}

impl InventoryTransaction {
    /// Builds a RECEIVE transaction.
    pub fn receive(
        id: impl Into<String>,
        item_id: impl Into<String>,
        quantity: Decimal,
        unit_cost: Money,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        InventoryTransaction {
            id: id.into(),
            item_id: item_id.into(),
            transaction_type: TransactionType::Receive,
            quantity,
            unit_cost: Some(unit_cost),
            transaction_date,
        }
    }

    /// True for RECEIVE transactions.
    #[inline]
    pub fn is_receipt(&self) -> bool {
        self.transaction_type == TransactionType::Receive
    }
}

// =============================================================================
// ABC Class
// =============================================================================

/// ABC classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbcClass::A => write!(f, "A"),
            AbcClass::B => write!(f, "B"),
            AbcClass::C => write!(f, "C"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
