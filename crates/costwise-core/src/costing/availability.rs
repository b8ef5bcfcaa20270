//! Available-quantity netting.
//!
//! ```text
//! available       = max(0, on_hand − reserved)
//! total_projected = available (+ on_order when include_on_order)
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::money::serialize_normalized;
use crate::validation::{checked_add, validate_item_id, validate_non_negative};

/// Input for [`calculate_available_quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableQuantityInput {
    pub item_id: String,
    #[serde(serialize_with = "serialize_normalized")]
    pub quantity_on_hand: Decimal,
    #[serde(serialize_with = "serialize_normalized")]
    pub quantity_reserved: Decimal,
    #[serde(default, serialize_with = "serialize_normalized")]
    pub quantity_on_order: Decimal,
    #[serde(default)]
    pub include_on_order: bool,
}

impl AvailableQuantityInput {
    pub fn new(item_id: impl Into<String>, on_hand: Decimal, reserved: Decimal) -> Self {
        AvailableQuantityInput {
            item_id: item_id.into(),
            quantity_on_hand: on_hand,
            quantity_reserved: reserved,
            quantity_on_order: Decimal::ZERO,
            include_on_order: false,
        }
    }

    /// Counts open purchase orders toward the projection.
    pub fn with_on_order(mut self, on_order: Decimal) -> Self {
        self.quantity_on_order = on_order;
        self.include_on_order = true;
        self
    }
}

/// Netted quantities for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableQuantityResult {
    pub item_id: String,
    pub quantity_available: Decimal,
    pub quantity_on_order: Decimal,
    pub total_projected: Decimal,
}

/// Nets reservations out of on-hand stock. Never returns a negative
/// `quantity_available`, even when reservations exceed stock.
pub fn calculate_available_quantity(input: &AvailableQuantityInput) -> CoreResult<AvailableQuantityResult> {
    validate_item_id(&input.item_id)?;
    validate_non_negative("quantity_on_hand", input.quantity_on_hand)?;
    validate_non_negative("quantity_reserved", input.quantity_reserved)?;
    validate_non_negative("quantity_on_order", input.quantity_on_order)?;

    let available = (input.quantity_on_hand - input.quantity_reserved).max(Decimal::ZERO);
    let projected = if input.include_on_order {
        checked_add("total_projected", available, input.quantity_on_order)?
    } else {
        available
    };

    Ok(AvailableQuantityResult {
        item_id: input.item_id.clone(),
        quantity_available: available,
        quantity_on_order: input.quantity_on_order,
        total_projected: projected,
    })
}
