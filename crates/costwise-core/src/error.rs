//! # Error Types
//!
//! Domain-specific error types for costwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  costwise-core errors (this file)                                      │
//! │  ├── CoreError        - Costing rule violations                        │
//! │  └── ValidationError  - Input shape/range failures                     │
//! │                                                                         │
//! │  costwise-cache errors (separate crate)                                │
//! │  └── CacheError       - Config / external store failures               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CalculationError (returned value) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is ever raised past a calculator boundary. Every operation
//! folds its `CoreError` into a [`CalculationResult`](crate::CalculationResult)
//! so the cache can store failures next to successes.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::money::Currency;

// =============================================================================
// Core Error
// =============================================================================

/// Costing engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input failed shape or range validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// STANDARD_COST valuation requested without a standard cost.
    #[error("Standard cost is required for item {item_id} using STANDARD_COST")]
    MissingStandardCost { item_id: String },

    /// The costing method name is not one this engine implements.
    #[error("Unsupported costing method: {method}")]
    UnsupportedCostingMethod { method: String },

    /// ABC analysis called with an empty item list.
    #[error("No items provided for analysis")]
    NoItemsProvided,

    /// Two Money values with different currencies were combined.
    ///
    /// ## When This Occurs
    /// ```text
    /// carrying_cost(avg = 100 USD, fixed_storage = 100 EUR)
    ///      │
    ///      ▼
    /// CurrencyMismatch { expected: USD, found: EUR }
    /// ```
    /// Amounts are never converted implicitly.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// The computation itself blew up (panic, serialization failure).
    #[error("Computation failed: {0}")]
    ComputationFailed(String),
}

impl CoreError {
    /// Stable machine-readable code, carried in `CalculationError.code`.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::MissingStandardCost { .. } => "MISSING_STANDARD_COST",
            CoreError::UnsupportedCostingMethod { .. } => "UNSUPPORTED_COSTING_METHOD",
            CoreError::NoItemsProvided => "NO_ITEMS_PROVIDED",
            CoreError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            CoreError::ComputationFailed(_) => "COMPUTATION_FAILED",
        }
    }

    /// Structured context for the error record.
    pub fn context(&self) -> BTreeMap<String, String> {
        let mut ctx = BTreeMap::new();
        match self {
            CoreError::Validation(v) => {
                ctx.insert("field".to_string(), v.field().to_string());
            }
            CoreError::MissingStandardCost { item_id } => {
                ctx.insert("item_id".to_string(), item_id.clone());
            }
            CoreError::UnsupportedCostingMethod { method } => {
                ctx.insert("method".to_string(), method.clone());
            }
            CoreError::CurrencyMismatch { expected, found } => {
                ctx.insert("expected".to_string(), expected.to_string());
                ctx.insert("found".to_string(), found.to_string());
            }
            CoreError::NoItemsProvided | CoreError::ComputationFailed(_) => {}
        }
        ctx
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any arithmetic runs; an operation that fails validation
/// produces no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Value must be strictly greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Invalid format (e.g., lowercase currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The formula would divide by zero.
    #[error("{field} must not be zero (used as a divisor)")]
    DivisionByZero { field: String },

    /// An intermediate result does not fit in a `Decimal`.
    #[error("{field} is too large to compute")]
    Overflow { field: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::MustBeNonNegative { field }
            | ValidationError::MustBePositive { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::DivisionByZero { field }
            | ValidationError::Overflow { field } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
