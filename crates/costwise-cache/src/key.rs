//! # Cache Keys
//!
//! A key is a SHA-256 digest over the calculator name, the operation name and
//! a canonical rendering of the input.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  input ──serde──► JSON value ──canonicalize──► canonical text           │
//! │                                                                         │
//! │  canonical rules                                                        │
//! │  • object keys sorted, recursively                                      │
//! │  • floats written with 8 fixed decimals, whole floats as integers       │
//! │  • {"amount": "12.50", "currency": "USD"}  →  "12.5:USD"                │
//! │                                                                         │
//! │  sha256("valuation" | "stock_valuation" | canonical text)               │
//! │       → "valuation:stock_valuation:9f86d081…"                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two inputs that differ only in field order or in trailing zeros of a
//! money amount produce the same key. Input quantities and rates serialize
//! normalized (see `costwise_core::money::serialize_normalized`), so
//! `20` and `20.0` on hand hash alike too.

use std::fmt::{self, Write as _};

use costwise_core::Money;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::CacheResult;

/// Fixed precision for non-integer JSON numbers.
const FLOAT_PRECISION: usize = 8;

/// Largest magnitude at which every integer is exact in an `f64`.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Separator between hashed key components.
const COMPONENT_SEPARATOR: u8 = b'|';

// =============================================================================
// Cache Key
// =============================================================================

/// Deterministic identity of one calculator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for `calculator.operation(input)`.
    ///
    /// ## Example
    /// ```rust
    /// use costwise_cache::CacheKey;
    /// use serde_json::json;
    ///
    /// let a = CacheKey::derive("inventory", "available_quantity", &json!({"a": 1, "b": 2})).unwrap();
    /// let b = CacheKey::derive("inventory", "available_quantity", &json!({"b": 2, "a": 1})).unwrap();
    /// assert_eq!(a, b);
    /// assert!(a.as_str().starts_with("inventory:available_quantity:"));
    /// ```
    pub fn derive<I>(calculator: &str, operation: &str, input: &I) -> CacheResult<CacheKey>
    where
        I: Serialize + ?Sized,
    {
        let value = serde_json::to_value(input)?;
        let canonical = canonicalize(&value);

        let mut hasher = Sha256::new();
        hasher.update(calculator.as_bytes());
        hasher.update([COMPONENT_SEPARATOR]);
        hasher.update(operation.as_bytes());
        hasher.update([COMPONENT_SEPARATOR]);
        hasher.update(canonical.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Ok(CacheKey(format!("{}:{}:{}", calculator, operation, digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used in the external store.
    pub fn external(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.0.clone()
        } else {
            format!("{}:{}", prefix, self.0)
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Canonicalization
// =============================================================================

/// Renders a JSON value in canonical form.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                out.push_str(&n.to_string());
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INT {
                    let _ = write!(out, "{}", f as i64);
                } else {
                    let _ = write!(out, "{:.*}", FLOAT_PRECISION, f);
                }
            }
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => match money_canonical(map) {
            Some(money) => write_string(&money, out),
            None => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (idx, key) in keys.into_iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    write_string(key, out);
                    out.push(':');
                    write_canonical(&map[key.as_str()], out);
                }
                out.push('}');
            }
        },
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json escaping is stable for a given string.
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

/// `{amount, currency}` objects become [`Money::canonical`].
fn money_canonical(map: &Map<String, Value>) -> Option<String> {
    if map.len() != 2 || !map.contains_key("amount") || !map.contains_key("currency") {
        return None;
    }
    serde_json::from_value::<Money>(Value::Object(map.clone()))
        .ok()
        .map(|money| money.canonical())
}
