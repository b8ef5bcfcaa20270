//! # Replenishment Sizing
//!
//! Reorder point and economic order quantity.
//!
//! ## Reorder Point
//! ```text
//! daily_usage      = avg_monthly_usage / 30
//! lead_time_stock  = daily_usage × lead_time_days × seasonality_factor
//! safety_stock     = daily_usage × safety_stock_days
//! reorder_point    = max(lead_time_stock + safety_stock, minimum_stock)
//! recommended_qty  = max(2 × avg_monthly_usage, reorder_point)
//! review_every     = max(7, lead_time_days / 2)
//!
//! Every output is rounded up to a whole unit.
//! ```
//!
//! ## Economic Order Quantity
//! ```text
//! EOQ = √(2 × annual_demand × ordering_cost / holding_cost_per_unit)
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{serialize_normalized, Money};
use crate::validation::{
    checked_add, checked_div, checked_mul, validate_item_id, validate_non_negative,
    validate_non_negative_money, validate_positive_money,
};

/// Days per month used to derive daily usage.
pub const DAYS_PER_MONTH: u32 = 30;

/// Floor for the review cycle, in days.
pub const MIN_REVIEW_FREQUENCY_DAYS: u32 = 7;

fn default_safety_stock_days() -> Decimal {
    Decimal::from(7)
}

fn default_seasonality_factor() -> Decimal {
    Decimal::ONE
}

/// Precision kept before rounding up; absorbs the last-digit residue that
/// 28-digit division and sqrt leave behind (200/30 × 3 = 20.000...01).
const CEIL_GUARD_DP: u32 = 8;

/// Rounds up and converts to a whole unit count.
fn ceil_units(field: &str, value: Decimal) -> CoreResult<u64> {
    value.round_dp(CEIL_GUARD_DP).ceil().to_u64().ok_or_else(|| {
        CoreError::from(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: u64::MAX.to_string(),
        })
    })
}

// =============================================================================
// Reorder Point
// =============================================================================

/// Input for [`calculate_reorder_point`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPointInput {
    pub item_id: String,
    #[serde(serialize_with = "serialize_normalized")]
    pub average_monthly_usage: Decimal,
    #[serde(serialize_with = "serialize_normalized")]
    pub lead_time_days: Decimal,
    #[serde(default = "default_safety_stock_days", serialize_with = "serialize_normalized")]
    pub safety_stock_days: Decimal,
    #[serde(default = "default_seasonality_factor", serialize_with = "serialize_normalized")]
    pub seasonality_factor: Decimal,
    #[serde(default, serialize_with = "serialize_normalized")]
    pub minimum_stock: Decimal,
}

impl ReorderPointInput {
    /// Input with the default 7 safety days, no seasonality and no floor.
    pub fn new(item_id: impl Into<String>, average_monthly_usage: Decimal, lead_time_days: Decimal) -> Self {
        ReorderPointInput {
            item_id: item_id.into(),
            average_monthly_usage,
            lead_time_days,
            safety_stock_days: default_safety_stock_days(),
            seasonality_factor: default_seasonality_factor(),
            minimum_stock: Decimal::ZERO,
        }
    }

    pub fn with_safety_stock_days(mut self, days: Decimal) -> Self {
        self.safety_stock_days = days;
        self
    }

    pub fn with_seasonality_factor(mut self, factor: Decimal) -> Self {
        self.seasonality_factor = factor;
        self
    }

    pub fn with_minimum_stock(mut self, minimum: Decimal) -> Self {
        self.minimum_stock = minimum;
        self
    }
}

/// Reorder sizing, all in whole units/days rounded up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPointResult {
    pub item_id: String,
    pub daily_usage: u64,
    pub lead_time_stock: u64,
    pub safety_stock: u64,
    pub reorder_point: u64,
    pub recommended_order_quantity: u64,
    pub review_frequency_days: u64,
}

/// Computes the reorder point for one item.
///
/// Intermediate values stay exact; rounding happens once per output so
/// `reorder_point` is not inflated by rounding its components first.
pub fn calculate_reorder_point(input: &ReorderPointInput) -> CoreResult<ReorderPointResult> {
    validate_item_id(&input.item_id)?;
    validate_non_negative("average_monthly_usage", input.average_monthly_usage)?;
    validate_non_negative("lead_time_days", input.lead_time_days)?;
    validate_non_negative("safety_stock_days", input.safety_stock_days)?;
    validate_non_negative("seasonality_factor", input.seasonality_factor)?;
    validate_non_negative("minimum_stock", input.minimum_stock)?;

    let daily_usage = input.average_monthly_usage / Decimal::from(DAYS_PER_MONTH);
    let lead_time_stock = checked_mul(
        "lead_time_stock",
        checked_mul("lead_time_stock", daily_usage, input.lead_time_days)?,
        input.seasonality_factor,
    )?;
    let safety_stock = checked_mul("safety_stock", daily_usage, input.safety_stock_days)?;
    let reorder_point =
        checked_add("reorder_point", lead_time_stock, safety_stock)?.max(input.minimum_stock);
    let recommended =
        checked_mul("recommended_order_quantity", input.average_monthly_usage, Decimal::TWO)?.max(reorder_point);
    let review = (input.lead_time_days / Decimal::TWO).max(Decimal::from(MIN_REVIEW_FREQUENCY_DAYS));

    Ok(ReorderPointResult {
        item_id: input.item_id.clone(),
        daily_usage: ceil_units("daily_usage", daily_usage)?,
        lead_time_stock: ceil_units("lead_time_stock", lead_time_stock)?,
        safety_stock: ceil_units("safety_stock", safety_stock)?,
        reorder_point: ceil_units("reorder_point", reorder_point)?,
        recommended_order_quantity: ceil_units("recommended_order_quantity", recommended)?,
        review_frequency_days: ceil_units("review_frequency_days", review)?,
    })
}

// =============================================================================
// Economic Order Quantity
// =============================================================================

/// Input for [`calculate_economic_order_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicOrderQuantityInput {
    pub item_id: String,
    #[serde(serialize_with = "serialize_normalized")]
    pub annual_demand: Decimal,
    pub ordering_cost: Money,
    pub holding_cost_per_unit: Money,
}

/// EOQ with the resulting order cadence and annual cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicOrderQuantityResult {
    pub item_id: String,
    /// Exact EOQ, 2 dp.
    pub economic_order_quantity: Decimal,
    /// EOQ rounded up to whole units.
    pub order_quantity: u64,
    pub orders_per_year: Decimal,
    /// Ordering plus holding cost at the exact EOQ.
    pub total_annual_cost: Money,
}

/// Computes EOQ. Ordering and holding costs must share a currency.
pub fn calculate_economic_order_quantity(
    input: &EconomicOrderQuantityInput,
) -> CoreResult<EconomicOrderQuantityResult> {
    validate_item_id(&input.item_id)?;
    validate_non_negative("annual_demand", input.annual_demand)?;
    validate_non_negative_money("ordering_cost", &input.ordering_cost)?;
    validate_positive_money("holding_cost_per_unit", &input.holding_cost_per_unit)?;
    input.ordering_cost.ensure_same_currency(&input.holding_cost_per_unit)?;

    let currency = input.ordering_cost.currency();
    let doubled_demand = checked_mul("annual_demand", Decimal::TWO, input.annual_demand)?;
    let radicand = checked_div(
        "economic_order_quantity",
        checked_mul("economic_order_quantity", doubled_demand, input.ordering_cost.amount())?,
        input.holding_cost_per_unit.amount(),
    )?;
    let eoq = radicand.sqrt().ok_or_else(|| {
        CoreError::ComputationFailed(format!("square root of {} is undefined", radicand))
    })?;

    let (orders_per_year, total_cost) = if eoq.is_zero() {
        (Decimal::ZERO, Money::zero(currency))
    } else {
        let orders = checked_div("orders_per_year", input.annual_demand, eoq)?;
        let ordering = input.ordering_cost.multiply(orders, "total_annual_cost")?;
        let holding = input
            .holding_cost_per_unit
            .multiply(eoq / Decimal::TWO, "total_annual_cost")?;
        (orders, ordering.checked_add(&holding)?)
    };

    Ok(EconomicOrderQuantityResult {
        item_id: input.item_id.clone(),
        economic_order_quantity: eoq.round_dp(2),
        order_quantity: ceil_units("order_quantity", eoq)?,
        orders_per_year: orders_per_year.round_dp(2),
        total_annual_cost: total_cost.round_dp(2),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reorder_point_reference_case() {
        let r = calculate_reorder_point(&ReorderPointInput::new("42", dec!(300), dec!(14))).unwrap();
        assert_eq!(r.daily_usage, 10);
        assert_eq!(r.lead_time_stock, 140);
        assert_eq!(r.safety_stock, 70);
        assert_eq!(r.reorder_point, 210);
        assert_eq!(r.recommended_order_quantity, 600);
        assert_eq!(r.review_frequency_days, 7);
    }

    #[test]
    fn test_reorder_point_rounds_up() {
        // daily = 100/30 = 3.333..; lead = 3.33×5 = 16.67; safety = 23.33; rop = 40
        let r = calculate_reorder_point(&ReorderPointInput::new("42", dec!(100), dec!(5))).unwrap();
        assert_eq!(r.daily_usage, 4);
        assert_eq!(r.lead_time_stock, 17);
        assert_eq!(r.safety_stock, 24);
        assert_eq!(r.reorder_point, 40);
        assert_eq!(r.recommended_order_quantity, 200);
    }

    #[test]
    fn test_division_residue_does_not_round_up() {
        // 200/30 × 3 carries a residue in the 28th digit; still exactly 20.
        let r = calculate_reorder_point(
            &ReorderPointInput::new("42", dec!(200), dec!(3)).with_safety_stock_days(dec!(0)),
        )
        .unwrap();
        assert_eq!(r.lead_time_stock, 20);
    }

    #[test]
    fn test_minimum_stock_floor() {
        let r = calculate_reorder_point(
            &ReorderPointInput::new("42", dec!(30), dec!(1)).with_minimum_stock(dec!(50)),
        )
        .unwrap();
        assert_eq!(r.reorder_point, 50);
        assert_eq!(r.recommended_order_quantity, 60);
    }

    #[test]
    fn test_seasonality_and_long_lead_time() {
        let r = calculate_reorder_point(
            &ReorderPointInput::new("42", dec!(300), dec!(30))
                .with_seasonality_factor(dec!(1.5))
                .with_safety_stock_days(dec!(0)),
        )
        .unwrap();
        assert_eq!(r.lead_time_stock, 450);
        assert_eq!(r.reorder_point, 450);
        assert_eq!(r.recommended_order_quantity, 600);
        assert_eq!(r.review_frequency_days, 15);
    }

    #[test]
    fn test_reorder_point_rejects_negative() {
        assert!(calculate_reorder_point(&ReorderPointInput::new("42", dec!(-1), dec!(5))).is_err());
        assert!(calculate_reorder_point(&ReorderPointInput::new("42", dec!(1), dec!(-5))).is_err());
    }

    fn eoq_input(demand: Decimal, ordering: Money, holding: Money) -> EconomicOrderQuantityInput {
        EconomicOrderQuantityInput {
            item_id: "42".into(),
            annual_demand: demand,
            ordering_cost: ordering,
            holding_cost_per_unit: holding,
        }
    }

    #[test]
    fn test_eoq_textbook() {
        let r = calculate_economic_order_quantity(&eoq_input(
            dec!(1000),
            Money::new(dec!(10), Currency::USD),
            Money::new(dec!(2), Currency::USD),
        ))
        .unwrap();
        assert_eq!(r.economic_order_quantity, dec!(100));
        assert_eq!(r.order_quantity, 100);
        assert_eq!(r.orders_per_year, dec!(10));
        assert_eq!(r.total_annual_cost.amount(), dec!(200));
    }

    #[test]
    fn test_eoq_zero_demand() {
        let r = calculate_economic_order_quantity(&eoq_input(
            dec!(0),
            Money::new(dec!(10), Currency::USD),
            Money::new(dec!(2), Currency::USD),
        ))
        .unwrap();
        assert_eq!(r.order_quantity, 0);
        assert!(r.total_annual_cost.is_zero());
    }

    #[test]
    fn test_eoq_currency_mismatch() {
        let err = calculate_economic_order_quantity(&eoq_input(
            dec!(1000),
            Money::new(dec!(10), Currency::USD),
            Money::new(dec!(2), Currency::new("EUR").unwrap()),
        ))
        .unwrap_err();
        assert_eq!(err.code(), "CURRENCY_MISMATCH");
    }

    #[test]
    fn test_eoq_overflow_is_an_error() {
        let err = calculate_economic_order_quantity(&eoq_input(
            Decimal::MAX,
            Money::new(dec!(1000000), Currency::USD),
            Money::new(dec!(1), Currency::USD),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Overflow { ref field }) if field == "annual_demand"
        ));
    }

    #[test]
    fn test_reorder_point_overflow_is_an_error() {
        let err = calculate_reorder_point(&ReorderPointInput::new("42", Decimal::MAX, Decimal::MAX))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_eoq_requires_positive_holding_cost() {
        assert!(calculate_economic_order_quantity(&eoq_input(
            dec!(1000),
            Money::new(dec!(10), Currency::USD),
            Money::zero(Currency::USD),
        ))
        .is_err());
    }
}
