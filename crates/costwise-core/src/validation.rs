//! # Validation Module
//!
//! Input validation shared by every costing operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validate, then compute                             │
//! │                                                                         │
//! │  Operation input                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE: identifiers, signs, ranges, currencies                    │
//! │       │                                                                 │
//! │       ├── any failure → ValidationError (no partial result)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Formula runs on inputs it can trust                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use costwise_core::validation::{validate_item_id, validate_non_negative};
//! use rust_decimal::Decimal;
//!
//! validate_item_id("SKU-42").unwrap();
//! validate_non_negative("quantity_on_hand", Decimal::from(5)).unwrap();
//! assert!(validate_non_negative("quantity_on_hand", Decimal::from(-1)).is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted item identifier.
pub const MAX_ITEM_ID_LEN: usize = 128;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item identifier.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_ITEM_ID_LEN`] characters
pub fn validate_item_id(item_id: &str) -> ValidationResult<()> {
    let trimmed = item_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "item_id".to_string(),
        });
    }

    if trimmed.len() > MAX_ITEM_ID_LEN {
        return Err(ValidationError::OutOfRange {
            field: "item_id".to_string(),
            min: "1".to_string(),
            max: MAX_ITEM_ID_LEN.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects values below zero.
pub fn validate_non_negative(field: &str, value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rejects zero and negative values.
pub fn validate_positive(field: &str, value: Decimal) -> ValidationResult<()> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rejects values outside `[min, max]`.
pub fn validate_range(field: &str, value: Decimal, min: Decimal, max: Decimal) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// Rejects negative money amounts.
pub fn validate_non_negative_money(field: &str, value: &Money) -> ValidationResult<()> {
    validate_non_negative(field, value.amount())
}

/// Rejects zero and negative money amounts.
pub fn validate_positive_money(field: &str, value: &Money) -> ValidationResult<()> {
    validate_positive(field, value.amount())
}

// =============================================================================
// Checked Arithmetic
// =============================================================================

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

/// `a + b`, or `Overflow` naming `field`.
pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> ValidationResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(field))
}

/// `a − b`, or `Overflow` naming `field`.
pub fn checked_sub(field: &str, a: Decimal, b: Decimal) -> ValidationResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(field))
}

/// `a × b`, or `Overflow` naming `field`.
pub fn checked_mul(field: &str, a: Decimal, b: Decimal) -> ValidationResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(field))
}

/// `a ÷ b`; a zero divisor is `DivisionByZero`, anything else that does not
/// fit is `Overflow`.
pub fn checked_div(field: &str, a: Decimal, b: Decimal) -> ValidationResult<Decimal> {
    if b.is_zero() {
        return Err(ValidationError::DivisionByZero {
            field: field.to_string(),
        });
    }
    a.checked_div(b).ok_or_else(|| overflow(field))
}

/// Sum of `values`, failing on the first addition that overflows.
pub fn checked_sum<I>(field: &str, values: I) -> ValidationResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| checked_add(field, acc, value))
}

// =============================================================================
// Unit Tests
// =============================================================================
