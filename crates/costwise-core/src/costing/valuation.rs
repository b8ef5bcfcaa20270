//! # Stock Valuation
//!
//! Assigns a unit cost to on-hand stock and values it.
//!
//! ## Method Summary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method            Unit cost                                            │
//! │  ────────────────  ─────────────────────────────────────────────────    │
//! │  STANDARD_COST     standard_cost (required)                             │
//! │  FIFO              Σ(qty×cost) / Σqty over receipt layers, oldest first │
//! │  LIFO              cost of the newest receipt                           │
//! │  MOVING_AVERAGE    mean of the last 5 receipt costs                     │
//! │  WEIGHTED_AVERAGE  Σ(qty×cost) / Σqty over every receipt                │
//! │                                                                         │
//! │  No receipts → average_cost, or zero in the input currency              │
//! │  total_value = quantity_on_hand × unit_cost                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## FIFO semantics
//! Layers are never depleted by issues. FIFO values stock at the weighted
//! average of every receipt layer, which means it reports the same number as
//! WEIGHTED_AVERAGE. Switching to layer consumption changes reported
//! valuations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{ensure_currency, serialize_normalized, Currency, Money};
use crate::types::{CostingMethod, InventoryTransaction};
use crate::validation::{
    checked_add, checked_div, checked_mul, checked_sum, validate_item_id, validate_non_negative,
    validate_non_negative_money,
};

/// Receipts averaged by MOVING_AVERAGE.
pub const MOVING_AVERAGE_WINDOW: usize = 5;

/// Decimal places kept on unit costs.
pub const UNIT_COST_DP: u32 = 4;

/// Decimal places kept on extended values.
pub const VALUE_DP: u32 = 2;

// =============================================================================
// Input / Result
// =============================================================================

/// Input for [`calculate_stock_valuation`].
///
/// `costing_method` is the raw name stored on the item record; it is parsed
/// during validation so an unknown method becomes a returned
/// `UnsupportedCostingMethod` rather than a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockValuationInput {
    pub item_id: String,
    #[serde(serialize_with = "serialize_normalized")]
    pub quantity_on_hand: Decimal,
    pub costing_method: String,
    pub currency: Currency,
    #[serde(default)]
    pub transactions: Vec<InventoryTransaction>,
    #[serde(default)]
    pub average_cost: Option<Money>,
    #[serde(default)]
    pub standard_cost: Option<Money>,
}

impl StockValuationInput {
    pub fn new(
        item_id: impl Into<String>,
        quantity_on_hand: Decimal,
        costing_method: CostingMethod,
        currency: Currency,
    ) -> Self {
        StockValuationInput {
            item_id: item_id.into(),
            quantity_on_hand,
            costing_method: costing_method.as_str().to_string(),
            currency,
            transactions: Vec::new(),
            average_cost: None,
            standard_cost: None,
        }
    }

    pub fn with_transactions(mut self, transactions: Vec<InventoryTransaction>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn with_average_cost(mut self, cost: Money) -> Self {
        self.average_cost = Some(cost);
        self
    }

    pub fn with_standard_cost(mut self, cost: Money) -> Self {
        self.standard_cost = Some(cost);
        self
    }

    /// Number of RECEIVE transactions. Only receipts move the unit cost, so
    /// this is the version of the item's transaction history.
    pub fn receipt_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_receipt()).count()
    }
}

/// Valuation of one item's on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockValuationResult {
    pub item_id: String,
    pub costing_method: CostingMethod,
    pub quantity_on_hand: Decimal,
    pub unit_cost: Money,
    pub total_value: Money,
    /// Receipt layers that contributed to `unit_cost` (0 on fallback).
    pub layers_used: usize,
}

// =============================================================================
// Cost Layers
// =============================================================================

/// One receipt's quantity at its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CostLayer {
    quantity: Decimal,
    unit_cost: Decimal,
    received_at: DateTime<Utc>,
}

/// Builds receipt layers ordered oldest first.
///
/// Receipts with the same timestamp keep their input order.
fn build_layers(input: &StockValuationInput) -> CoreResult<Vec<CostLayer>> {
    let mut layers = Vec::new();

    for (idx, tx) in input.transactions.iter().enumerate() {
        if tx.item_id != input.item_id {
            return Err(ValidationError::InvalidFormat {
                field: format!("transactions[{}].item_id", idx),
                reason: format!(
                    "transaction {} belongs to item {}, not {}",
                    tx.id, tx.item_id, input.item_id
                ),
            }
            .into());
        }

        if !tx.is_receipt() {
            continue;
        }

        let cost = tx.unit_cost.ok_or_else(|| ValidationError::Required {
            field: format!("transactions[{}].unit_cost", idx),
        })?;
        ensure_currency(input.currency, &cost)?;
        validate_non_negative_money(&format!("transactions[{}].unit_cost", idx), &cost)?;
        validate_non_negative(&format!("transactions[{}].quantity", idx), tx.quantity)?;

        if tx.quantity.is_zero() {
            continue;
        }

        layers.push(CostLayer {
            quantity: tx.quantity,
            unit_cost: cost.amount(),
            received_at: tx.transaction_date,
        });
    }

    // Stable sort: equal dates keep input order.
    layers.sort_by_key(|layer| layer.received_at);
    Ok(layers)
}

/// Σ(qty × cost) / Σqty, or `None` when there is no quantity.
fn quantity_weighted(layers: &[CostLayer]) -> CoreResult<Option<Decimal>> {
    let total_qty = checked_sum("transactions.quantity", layers.iter().map(|l| l.quantity))?;
    if total_qty.is_zero() {
        return Ok(None);
    }
    let mut total_cost = Decimal::ZERO;
    for layer in layers {
        let extended = checked_mul("transactions.unit_cost", layer.quantity, layer.unit_cost)?;
        total_cost = checked_add("transactions.unit_cost", total_cost, extended)?;
    }
    Ok(Some(checked_div("unit_cost", total_cost, total_qty)?))
}

// =============================================================================
// Valuation
// =============================================================================

/// Values an item's on-hand stock with its configured costing method.
///
/// ## Errors
/// - `Validation` for empty item ids, negative quantities or costs, RECEIVE
///   rows without a unit cost, and transactions for another item
/// - `UnsupportedCostingMethod` for unknown method names
/// - `MissingStandardCost` for STANDARD_COST without `standard_cost`
/// - `CurrencyMismatch` when any Money is not in `currency`
pub fn calculate_stock_valuation(input: &StockValuationInput) -> CoreResult<StockValuationResult> {
    validate_item_id(&input.item_id)?;
    validate_non_negative("quantity_on_hand", input.quantity_on_hand)?;
    let method: CostingMethod = input.costing_method.parse()?;

    for (field, cost) in [
        ("average_cost", input.average_cost.as_ref()),
        ("standard_cost", input.standard_cost.as_ref()),
    ] {
        if let Some(cost) = cost {
            ensure_currency(input.currency, cost)?;
            validate_non_negative_money(field, cost)?;
        }
    }

    let layers = build_layers(input)?;
    let fallback = input
        .average_cost
        .map(|m| m.amount())
        .unwrap_or(Decimal::ZERO);

    let (unit_cost, layers_used) = match method {
        CostingMethod::StandardCost => {
            let standard = input.standard_cost.ok_or_else(|| CoreError::MissingStandardCost {
                item_id: input.item_id.clone(),
            })?;
            (standard.amount(), 0)
        }
        CostingMethod::Fifo | CostingMethod::WeightedAverage => match quantity_weighted(&layers)? {
            Some(cost) => (cost, layers.len()),
            None => (fallback, 0),
        },
        CostingMethod::Lifo => match layers.last() {
            Some(newest) => (newest.unit_cost, 1),
            None => (fallback, 0),
        },
        CostingMethod::MovingAverage => {
            let start = layers.len().saturating_sub(MOVING_AVERAGE_WINDOW);
            let recent = &layers[start..];
            if recent.is_empty() {
                (fallback, 0)
            } else {
                let sum = checked_sum("transactions.unit_cost", recent.iter().map(|l| l.unit_cost))?;
                (checked_div("unit_cost", sum, Decimal::from(recent.len()))?, recent.len())
            }
        }
    };

    let unit_cost = Money::new(unit_cost, input.currency).round_dp(UNIT_COST_DP);
    let total_value = unit_cost
        .multiply(input.quantity_on_hand, "total_value")?
        .round_dp(VALUE_DP);

    Ok(StockValuationResult {
        item_id: input.item_id.clone(),
        costing_method: method,
        quantity_on_hand: input.quantity_on_hand,
        unit_cost,
        total_value,
        layers_used,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
    }

    fn receipt(id: &str, qty: Decimal, cost: Decimal, d: u32) -> InventoryTransaction {
        InventoryTransaction::receive(id, "42", qty, usd(cost), day(d))
    }

    /// 100 @ 10 on day 1, 50 @ 13 on day 3, 50 @ 16 on day 2 (out of order).
    fn three_receipts() -> Vec<InventoryTransaction> {
        vec![
            receipt("r1", dec!(100), dec!(10), 1),
            receipt("r3", dec!(50), dec!(13), 3),
            receipt("r2", dec!(50), dec!(16), 2),
        ]
    }

    fn input(method: CostingMethod) -> StockValuationInput {
        StockValuationInput::new("42", dec!(20), method, Currency::USD)
    }

    #[test]
    fn test_standard_cost() {
        let result = calculate_stock_valuation(
            &input(CostingMethod::StandardCost).with_standard_cost(usd(dec!(7.5))),
        )
        .unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(7.5));
        assert_eq!(result.total_value.amount(), dec!(150));
    }

    #[test]
    fn test_standard_cost_missing() {
        let err = calculate_stock_valuation(&input(CostingMethod::StandardCost)).unwrap_err();
        assert!(matches!(err, CoreError::MissingStandardCost { item_id } if item_id == "42"));
    }

    #[test]
    fn test_fifo_weights_all_layers() {
        // (100×10 + 50×16 + 50×13) / 200 = 2450 / 200 = 12.25
        let result = calculate_stock_valuation(
            &input(CostingMethod::Fifo).with_transactions(three_receipts()),
        )
        .unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(12.25));
        assert_eq!(result.total_value.amount(), dec!(245.00));
        assert_eq!(result.layers_used, 3);
    }

    #[test]
    fn test_weighted_average_matches_fifo() {
        let fifo = calculate_stock_valuation(
            &input(CostingMethod::Fifo).with_transactions(three_receipts()),
        )
        .unwrap();
        let weighted = calculate_stock_valuation(
            &input(CostingMethod::WeightedAverage).with_transactions(three_receipts()),
        )
        .unwrap();
        assert_eq!(fifo.unit_cost, weighted.unit_cost);
    }

    #[test]
    fn test_lifo_uses_newest_receipt_by_date() {
        let result = calculate_stock_valuation(
            &input(CostingMethod::Lifo).with_transactions(three_receipts()),
        )
        .unwrap();
        // r3 on day 3 is newest even though r2 is listed last.
        assert_eq!(result.unit_cost.amount(), dec!(13));
        assert_eq!(result.layers_used, 1);
    }

    #[test]
    fn test_moving_average_last_five() {
        let txs: Vec<_> = (1..=7u32)
            .map(|d| receipt(&format!("r{}", d), dec!(1), Decimal::from(d * 10), d))
            .collect();
        // last five costs: 30, 40, 50, 60, 70 → 50
        let result =
            calculate_stock_valuation(&input(CostingMethod::MovingAverage).with_transactions(txs))
                .unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(50));
        assert_eq!(result.layers_used, 5);
    }

    #[test]
    fn test_moving_average_fewer_than_window() {
        let txs = vec![receipt("a", dec!(1), dec!(3), 1), receipt("b", dec!(9), dec!(4), 2)];
        let result =
            calculate_stock_valuation(&input(CostingMethod::MovingAverage).with_transactions(txs))
                .unwrap();
        // Unweighted: (3 + 4) / 2
        assert_eq!(result.unit_cost.amount(), dec!(3.5));
    }

    #[test]
    fn test_no_receipts_falls_back_to_average_cost() {
        let result = calculate_stock_valuation(
            &input(CostingMethod::MovingAverage).with_average_cost(usd(dec!(8))),
        )
        .unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(8));
        assert_eq!(result.layers_used, 0);

        let zero = calculate_stock_valuation(&input(CostingMethod::Lifo)).unwrap();
        assert!(zero.unit_cost.is_zero());
        assert!(zero.total_value.is_zero());
    }

    #[test]
    fn test_non_receipts_ignored() {
        let mut txs = three_receipts();
        txs.push(InventoryTransaction {
            id: "i1".into(),
            item_id: "42".into(),
            transaction_type: TransactionType::Issue,
            quantity: dec!(500),
            unit_cost: None,
            transaction_date: day(4),
        });
        let result =
            calculate_stock_valuation(&input(CostingMethod::Lifo).with_transactions(txs)).unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(13));
    }

    #[test]
    fn test_unit_cost_rounding() {
        // 100 / 3 = 33.3333... → 33.3333; × 3 = 99.9999 → 100.00
        let txs = vec![receipt("a", dec!(3), dec!(100) / dec!(3), 1)];
        let result = calculate_stock_valuation(
            &StockValuationInput::new("42", dec!(3), CostingMethod::Fifo, Currency::USD)
                .with_transactions(txs),
        )
        .unwrap();
        assert_eq!(result.unit_cost.amount(), dec!(33.3333));
        assert_eq!(result.total_value.amount(), dec!(100.00));
    }

    #[test]
    fn test_huge_quantity_is_an_error_not_a_panic() {
        let huge = StockValuationInput::new("42", Decimal::MAX, CostingMethod::StandardCost, Currency::USD)
            .with_standard_cost(usd(dec!(2)));
        let err = calculate_stock_valuation(&huge).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Overflow { ref field }) if field == "total_value"
        ));

        let layers = vec![receipt("a", Decimal::MAX, dec!(2), 1)];
        let err = calculate_stock_valuation(&input(CostingMethod::Fifo).with_transactions(layers))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_receipt_count_ignores_other_movements() {
        let mut txs = three_receipts();
        txs.push(InventoryTransaction {
            id: "i1".into(),
            item_id: "42".into(),
            transaction_type: TransactionType::Issue,
            quantity: dec!(5),
            unit_cost: None,
            transaction_date: day(4),
        });
        assert_eq!(input(CostingMethod::Fifo).with_transactions(txs).receipt_count(), 3);
    }

    #[test]
    fn test_unsupported_method() {
        let mut bad = input(CostingMethod::Fifo);
        bad.costing_method = "HIFO".into();
        let err = calculate_stock_valuation(&bad).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_COSTING_METHOD");
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut bad = input(CostingMethod::Fifo);
        bad.quantity_on_hand = dec!(-1);
        assert!(matches!(
            calculate_stock_valuation(&bad).unwrap_err(),
            CoreError::Validation(ValidationError::MustBeNonNegative { .. })
        ));
    }

    #[test]
    fn test_receipt_currency_mismatch() {
        let eur = Currency::new("EUR").unwrap();
        let txs = vec![InventoryTransaction::receive("a", "42", dec!(1), Money::new(dec!(5), eur), day(1))];
        let err = calculate_stock_valuation(&input(CostingMethod::Fifo).with_transactions(txs))
            .unwrap_err();
        assert_eq!(err.code(), "CURRENCY_MISMATCH");
    }

    #[test]
    fn test_receipt_without_cost_rejected() {
        let mut tx = receipt("a", dec!(1), dec!(1), 1);
        tx.unit_cost = None;
        let err = calculate_stock_valuation(&input(CostingMethod::Fifo).with_transactions(vec![tx]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_foreign_item_transaction_rejected() {
        let tx = InventoryTransaction::receive("a", "99", dec!(1), usd(dec!(1)), day(1));
        assert!(calculate_stock_valuation(&input(CostingMethod::Fifo).with_transactions(vec![tx]))
            .is_err());
    }
}
