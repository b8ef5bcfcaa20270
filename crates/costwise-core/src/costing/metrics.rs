//! Inventory performance metrics.
//!
//! ```text
//! turnover       = COGS / average_inventory_value
//! days_of_supply = (average_inventory_value / COGS) × period_days
//! carrying_cost  = average_inventory_value × rate (+ fixed storage cost)
//! ```
//!
//! Every Money pair combined here must share a currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::{serialize_normalized, Money};
use crate::validation::{checked_mul, validate_non_negative, validate_non_negative_money, validate_positive};

/// Default reporting period for days-of-supply.
pub const DEFAULT_PERIOD_DAYS: u32 = 365;

fn default_period_days() -> Decimal {
    Decimal::from(DEFAULT_PERIOD_DAYS)
}

// =============================================================================
// Turnover
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTurnoverInput {
    pub cost_of_goods_sold: Money,
    pub average_inventory_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTurnoverResult {
    /// Turns per period, 4 dp.
    pub turnover_ratio: Decimal,
}

pub fn calculate_inventory_turnover(input: &InventoryTurnoverInput) -> CoreResult<InventoryTurnoverResult> {
    validate_non_negative_money("cost_of_goods_sold", &input.cost_of_goods_sold)?;
    validate_non_negative_money("average_inventory_value", &input.average_inventory_value)?;
    let ratio = input
        .cost_of_goods_sold
        .ratio(&input.average_inventory_value, "average_inventory_value")?;
    Ok(InventoryTurnoverResult {
        turnover_ratio: ratio.round_dp(4),
    })
}

// =============================================================================
// Days Sales of Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaysSalesInventoryInput {
    pub average_inventory_value: Money,
    pub cost_of_goods_sold: Money,
    #[serde(default = "default_period_days", serialize_with = "serialize_normalized")]
    pub period_days: Decimal,
}

impl DaysSalesInventoryInput {
    /// Input over the default 365-day period.
    pub fn new(average_inventory_value: Money, cost_of_goods_sold: Money) -> Self {
        DaysSalesInventoryInput {
            average_inventory_value,
            cost_of_goods_sold,
            period_days: default_period_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaysSalesInventoryResult {
    /// Days of supply, 2 dp.
    pub days_sales_inventory: Decimal,
}

pub fn calculate_days_sales_inventory(
    input: &DaysSalesInventoryInput,
) -> CoreResult<DaysSalesInventoryResult> {
    validate_non_negative_money("average_inventory_value", &input.average_inventory_value)?;
    validate_non_negative_money("cost_of_goods_sold", &input.cost_of_goods_sold)?;
    validate_positive("period_days", input.period_days)?;
    let ratio = input
        .average_inventory_value
        .ratio(&input.cost_of_goods_sold, "cost_of_goods_sold")?;
    let days = checked_mul("days_sales_inventory", ratio, input.period_days)?;
    Ok(DaysSalesInventoryResult {
        days_sales_inventory: days.round_dp(2),
    })
}

// =============================================================================
// Carrying Cost
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryingCostInput {
    pub average_inventory_value: Money,
    /// Annual carrying rate as a fraction (0.25 = 25%).
    #[serde(serialize_with = "serialize_normalized")]
    pub carrying_cost_rate: Decimal,
    #[serde(default)]
    pub fixed_storage_cost: Option<Money>,
}

impl CarryingCostInput {
    pub fn new(average_inventory_value: Money, carrying_cost_rate: Decimal) -> Self {
        CarryingCostInput {
            average_inventory_value,
            carrying_cost_rate,
            fixed_storage_cost: None,
        }
    }

    pub fn with_fixed_storage_cost(mut self, cost: Money) -> Self {
        self.fixed_storage_cost = Some(cost);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryingCostResult {
    pub variable_cost: Money,
    pub fixed_cost: Money,
    pub total_carrying_cost: Money,
}

pub fn calculate_carrying_cost(input: &CarryingCostInput) -> CoreResult<CarryingCostResult> {
    validate_non_negative_money("average_inventory_value", &input.average_inventory_value)?;
    validate_non_negative("carrying_cost_rate", input.carrying_cost_rate)?;

    let currency = input.average_inventory_value.currency();
    let fixed = match input.fixed_storage_cost {
        Some(cost) => {
            validate_non_negative_money("fixed_storage_cost", &cost)?;
            input.average_inventory_value.ensure_same_currency(&cost)?;
            cost
        }
        None => Money::zero(currency),
    };

    let variable = input
        .average_inventory_value
        .multiply(input.carrying_cost_rate, "variable_cost")?
        .round_dp(2);
    let total = variable.checked_add(&fixed)?.round_dp(2);

    Ok(CarryingCostResult {
        variable_cost: variable,
        fixed_cost: fixed,
        total_carrying_cost: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn usd(v: Decimal) -> Money {
        Money::new(v, Currency::USD)
    }

    fn eur(v: Decimal) -> Money {
        Money::new(v, Currency::new("EUR").unwrap())
    }

    #[test]
    fn test_turnover() {
        let r = calculate_inventory_turnover(&InventoryTurnoverInput {
            cost_of_goods_sold: usd(dec!(120000)),
            average_inventory_value: usd(dec!(20000)),
        })
        .unwrap();
        assert_eq!(r.turnover_ratio, dec!(6));
    }

    #[test]
    fn test_turnover_zero_inventory() {
        let err = calculate_inventory_turnover(&InventoryTurnoverInput {
            cost_of_goods_sold: usd(dec!(1)),
            average_inventory_value: usd(dec!(0)),
        })
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_days_sales_inventory() {
        let r = calculate_days_sales_inventory(&DaysSalesInventoryInput::new(
            usd(dec!(20000)),
            usd(dec!(120000)),
        ))
        .unwrap();
        // 20000/120000 × 365 = 60.8333 → 60.83
        assert_eq!(r.days_sales_inventory, dec!(60.83));
    }

    #[test]
    fn test_days_sales_inventory_custom_period() {
        let mut input = DaysSalesInventoryInput::new(usd(dec!(50)), usd(dec!(100)));
        input.period_days = dec!(30);
        assert_eq!(
            calculate_days_sales_inventory(&input).unwrap().days_sales_inventory,
            dec!(15)
        );
    }

    #[test]
    fn test_carrying_cost() {
        let r = calculate_carrying_cost(&CarryingCostInput::new(usd(dec!(100)), dec!(0.25))).unwrap();
        assert_eq!(r.variable_cost.amount(), dec!(25));
        assert_eq!(r.total_carrying_cost.amount(), dec!(25));

        let with_fixed = calculate_carrying_cost(
            &CarryingCostInput::new(usd(dec!(100)), dec!(0.25)).with_fixed_storage_cost(usd(dec!(10))),
        )
        .unwrap();
        assert_eq!(with_fixed.total_carrying_cost.amount(), dec!(35));
    }

    #[test]
    fn test_large_values_are_errors_not_panics() {
        let dsi = calculate_days_sales_inventory(&DaysSalesInventoryInput::new(usd(Decimal::MAX), usd(dec!(1))))
            .unwrap_err();
        assert_eq!(dsi.context().get("field").map(String::as_str), Some("days_sales_inventory"));

        let carrying = calculate_carrying_cost(&CarryingCostInput::new(usd(Decimal::MAX), dec!(2))).unwrap_err();
        assert_eq!(carrying.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_carrying_cost_currency_mismatch() {
        let err = calculate_carrying_cost(
            &CarryingCostInput::new(usd(dec!(100)), dec!(0.25)).with_fixed_storage_cost(eur(dec!(100))),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_turnover_currency_mismatch() {
        let err = calculate_inventory_turnover(&InventoryTurnoverInput {
            cost_of_goods_sold: usd(dec!(100)),
            average_inventory_value: eur(dec!(100)),
        })
        .unwrap_err();
        assert_eq!(err.code(), "CURRENCY_MISMATCH");
    }
}
