//! # Money Module
//!
//! Provides the `Money` and `Currency` types for handling monetary values
//! safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Unit costs need MORE precision than cents:                             │
//! │    300 units received for $100.00 → $0.3333... per unit                 │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal + currency tag                              │
//! │    0.1 + 0.2 = 0.3 exactly, unit costs kept to 4 dp,                    │
//! │    totals rounded to 2 dp with banker's rounding                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Currency Rule
//! Arithmetic between two `Money` values requires the same currency.
//! Mixing currencies returns [`CoreError::CurrencyMismatch`]; there is no
//! implicit conversion anywhere in the engine.
//!
//! ## Usage
//! ```rust
//! use costwise_core::money::{Currency, Money};
//! use rust_decimal::Decimal;
//!
//! let usd = Currency::new("USD").unwrap();
//! let price = Money::new(Decimal::new(1099, 2), usd); // 10.99 USD
//!
//! let total = price.checked_add(&Money::from_minor(500, usd)).unwrap();
//! assert_eq!(total.amount(), Decimal::new(1599, 2));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation;

// =============================================================================
// Currency
// =============================================================================

/// ISO 4217 currency code, three uppercase ASCII letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    /// US dollar, used as the default reporting currency.
    pub const USD: Currency = Currency(*b"USD");

    /// Parses and validates a currency code.
    ///
    /// ## Example
    /// ```rust
    /// use costwise_core::money::Currency;
    ///
    /// assert!(Currency::new("EUR").is_ok());
    /// assert!(Currency::new("eur").is_err());
    /// assert!(Currency::new("EURO").is_err());
    /// ```
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: format!("'{}' is not a 3-letter uppercase ISO code", code),
            });
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Constructed only from validated ASCII.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.as_str().to_string()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// An exact decimal amount tagged with its currency.
///
/// ## Design Decisions
/// - **Decimal, not i64 cents**: unit costs routinely need sub-cent precision
/// - **Currency on every value**: mismatches are caught at the operation
///   that mixes them, not three layers later in a report
/// - **No operator overloads for Money + Money**: addition can fail, so it
///   is `checked_add` returning a `Result`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a Money value from an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    /// Creates a Money value from minor units (cents for USD).
    ///
    /// ## Example
    /// ```rust
    /// use costwise_core::money::{Currency, Money};
    /// use rust_decimal::Decimal;
    ///
    /// let price = Money::from_minor(1099, Currency::USD);
    /// assert_eq!(price.amount(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn from_minor(minor: i64, currency: Currency) -> Self {
        Money::new(Decimal::new(minor, 2), currency)
    }

    /// Zero in the given currency.
    #[inline]
    pub const fn zero(currency: Currency) -> Self {
        Money::new(Decimal::ZERO, currency)
    }

    /// Returns the decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency tag.
    #[inline]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Fails with `CurrencyMismatch` unless `other` shares this currency.
    pub fn ensure_same_currency(&self, other: &Money) -> CoreResult<()> {
        ensure_currency(self.currency, other)
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> CoreResult<Money> {
        self.ensure_same_currency(other)?;
        let amount = validation::checked_add("amount", self.amount, other.amount)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Subtracts two amounts of the same currency.
    pub fn checked_sub(&self, other: &Money) -> CoreResult<Money> {
        self.ensure_same_currency(other)?;
        let amount = validation::checked_sub("amount", self.amount, other.amount)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Scales the amount by a plain factor (quantity, rate).
    ///
    /// ## Example
    /// ```rust
    /// use costwise_core::money::{Currency, Money};
    /// use rust_decimal::Decimal;
    ///
    /// let unit_cost = Money::from_minor(299, Currency::USD);
    /// let line = unit_cost.multiply(Decimal::from(3), "line_total").unwrap();
    /// assert_eq!(line.amount(), Decimal::new(897, 2));
    ///
    /// assert!(unit_cost.multiply(Decimal::MAX, "line_total").is_err());
    /// ```
    #[inline]
    pub fn multiply(&self, factor: Decimal, field: &str) -> CoreResult<Money> {
        let amount = validation::checked_mul(field, self.amount, factor)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Divides the amount by a plain divisor.
    pub fn divide(&self, divisor: Decimal, field: &str) -> CoreResult<Money> {
        let amount = validation::checked_div(field, self.amount, divisor)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Dimensionless ratio `self / other`; both must share a currency.
    pub fn ratio(&self, other: &Money, field: &str) -> CoreResult<Decimal> {
        self.ensure_same_currency(other)?;
        Ok(validation::checked_div(field, self.amount, other.amount)?)
    }

    /// Rounds to `dp` decimal places using banker's rounding.
    ///
    /// ## Bankers Rounding
    /// ```text
    /// 0.125 → 0.12   0.135 → 0.14   (ties go to the even digit)
    /// ```
    /// Over millions of valuations this keeps rounding bias at zero.
    #[inline]
    pub fn round_dp(&self, dp: u32) -> Money {
        Money::new(
            self.amount
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven),
            self.currency,
        )
    }

    /// Sums an iterator of Money values, all of which must be in `currency`.
    pub fn sum<'a, I>(values: I, currency: Currency) -> CoreResult<Money>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        let mut total = Money::zero(currency);
        for value in values {
            total = total.checked_add(value)?;
        }
        Ok(total)
    }

    /// Canonical `amount:currency` form used in cache keys.
    ///
    /// Trailing zeros are normalized away, so `10.50 USD` and `10.5 USD`
    /// produce the same key.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.amount.normalize(), self.currency)
    }
}

/// Serializes a decimal without trailing zeros, so `20` and `20.0` produce
/// the same text.
///
/// Used on input quantities and rates, which feed cache keys.
pub fn serialize_normalized<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    Serialize::serialize(&value.normalize(), serializer)
}

/// Fails with `CurrencyMismatch` unless `value` is in `expected`.
pub fn ensure_currency(expected: Currency, value: &Money) -> CoreResult<()> {
    if value.currency != expected {
        return Err(CoreError::CurrencyMismatch {
            expected,
            found: value.currency,
        });
    }
    Ok(())
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `"12.50 USD"` (debugging and logs, not UI).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
