//! # ABC Classification
//!
//! Ranks items by annual consumption value and splits them into tiers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. sort by annual_value, descending (ties keep input order)            │
//! │  2. running total → cumulative % of grand total                         │
//! │  3. cumulative ≤ 80%  → A                                               │
//! │     cumulative ≤ 95%  → B                                               │
//! │     otherwise         → C                                               │
//! │                                                                         │
//! │  values [500, 300, 200] → 50% A, 80% A, 100% C                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The boundaries are inclusive: an item landing exactly on 80% is `A`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{ensure_currency, serialize_normalized, Money};
use crate::types::AbcClass;
use crate::validation::{
    checked_sum, validate_item_id, validate_non_negative, validate_non_negative_money, validate_range,
};

/// Output precision for percentages.
const PERCENT_DP: u32 = 2;

// =============================================================================
// Thresholds
// =============================================================================

/// Inclusive cumulative-percentage cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcThresholds {
    #[serde(serialize_with = "serialize_normalized")]
    pub a_max_percentage: Decimal,
    #[serde(serialize_with = "serialize_normalized")]
    pub b_max_percentage: Decimal,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        AbcThresholds {
            a_max_percentage: Decimal::from(80),
            b_max_percentage: Decimal::from(95),
        }
    }
}

impl AbcThresholds {
    /// Requires `0 < a ≤ b ≤ 100`.
    pub fn validate(&self) -> CoreResult<()> {
        validate_range(
            "thresholds.a_max_percentage",
            self.a_max_percentage,
            Decimal::new(1, 2),
            Decimal::ONE_HUNDRED,
        )?;
        validate_range(
            "thresholds.b_max_percentage",
            self.b_max_percentage,
            self.a_max_percentage,
            Decimal::ONE_HUNDRED,
        )?;
        Ok(())
    }

    /// Tier for a cumulative percentage.
    pub fn classify(&self, cumulative_percentage: Decimal) -> AbcClass {
        if cumulative_percentage <= self.a_max_percentage {
            AbcClass::A
        } else if cumulative_percentage <= self.b_max_percentage {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }
}

// =============================================================================
// Input / Result
// =============================================================================

/// One item's annual consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcItem {
    pub item_id: String,
    pub annual_value: Money,
    #[serde(serialize_with = "serialize_normalized")]
    pub annual_usage: Decimal,
}

impl AbcItem {
    pub fn new(item_id: impl Into<String>, annual_value: Money, annual_usage: Decimal) -> Self {
        AbcItem {
            item_id: item_id.into(),
            annual_value,
            annual_usage,
        }
    }
}

/// Input for [`perform_abc_analysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcAnalysisInput {
    pub items: Vec<AbcItem>,
    #[serde(default)]
    pub thresholds: AbcThresholds,
}

impl AbcAnalysisInput {
    pub fn new(items: Vec<AbcItem>) -> Self {
        AbcAnalysisInput {
            items,
            thresholds: AbcThresholds::default(),
        }
    }
}

/// One ranked, classified item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcItemResult {
    /// 1-based rank by value.
    pub rank: usize,
    pub item_id: String,
    pub annual_value: Money,
    pub annual_usage: Decimal,
    pub value_percentage: Decimal,
    pub cumulative_percentage: Decimal,
    pub class: AbcClass,
}

/// Per-tier totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcClassSummary {
    pub class: AbcClass,
    pub item_count: usize,
    pub total_value: Money,
    pub value_percentage: Decimal,
}

/// Classified items (ranked order) and tier summaries (A, B, C).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcAnalysisResult {
    pub items: Vec<AbcItemResult>,
    pub summary: Vec<AbcClassSummary>,
    pub total_value: Money,
}

impl AbcAnalysisResult {
    /// Class assigned to `item_id`, if present.
    pub fn class_of(&self, item_id: &str) -> Option<AbcClass> {
        self.items.iter().find(|i| i.item_id == item_id).map(|i| i.class)
    }
}

/// Share of `total`, in percent. Callers guarantee `part <= total`.
fn percentage(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    match part.checked_mul(Decimal::ONE_HUNDRED) {
        Some(scaled) => scaled / total,
        None => part / total * Decimal::ONE_HUNDRED,
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Classifies items into A/B/C tiers by cumulative value share.
///
/// ## Errors
/// - `NoItemsProvided` on an empty list
/// - `Validation` for blank ids, negative values or usage, bad thresholds
/// - `CurrencyMismatch` when items disagree on currency
///
/// When every value is zero all items land in `A` (0% cumulative).
pub fn perform_abc_analysis(input: &AbcAnalysisInput) -> CoreResult<AbcAnalysisResult> {
    let first = input.items.first().ok_or(CoreError::NoItemsProvided)?;
    let currency = first.annual_value.currency();
    input.thresholds.validate()?;

    for item in &input.items {
        validate_item_id(&item.item_id)?;
        validate_non_negative_money("annual_value", &item.annual_value)?;
        validate_non_negative("annual_usage", item.annual_usage)?;
        ensure_currency(currency, &item.annual_value)?;
    }

    let mut ranked: Vec<&AbcItem> = input.items.iter().collect();
    // Stable: equal values keep input order.
    ranked.sort_by(|a, b| b.annual_value.amount().cmp(&a.annual_value.amount()));

    let total = checked_sum("annual_value", ranked.iter().map(|i| i.annual_value.amount()))?;
    let mut cumulative = Decimal::ZERO;
    let mut items = Vec::with_capacity(ranked.len());

    for (idx, item) in ranked.into_iter().enumerate() {
        let value = item.annual_value.amount();
        cumulative += value;
        let cumulative_pct = percentage(cumulative, total);

        items.push(AbcItemResult {
            rank: idx + 1,
            item_id: item.item_id.clone(),
            annual_value: item.annual_value,
            annual_usage: item.annual_usage,
            value_percentage: percentage(value, total).round_dp(PERCENT_DP),
            cumulative_percentage: cumulative_pct.round_dp(PERCENT_DP),
            class: input.thresholds.classify(cumulative_pct),
        });
    }

    let summary = [AbcClass::A, AbcClass::B, AbcClass::C]
        .into_iter()
        .map(|class| {
            let members: Vec<&AbcItemResult> = items.iter().filter(|i| i.class == class).collect();
            let value: Decimal = members.iter().map(|i| i.annual_value.amount()).sum();
            AbcClassSummary {
                class,
                item_count: members.len(),
                total_value: Money::new(value, currency),
                value_percentage: percentage(value, total).round_dp(PERCENT_DP),
            }
        })
        .collect();

    Ok(AbcAnalysisResult {
        items,
        summary,
        total_value: Money::new(total, currency),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
