//! # Calculation Results
//!
//! Every calculator operation returns a [`CalculationResult`] instead of a
//! bare `Result`. The envelope is a plain value: it serializes, it can be
//! cached, and a cached failure looks exactly like a fresh one.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  success = true   →  value: Some(T),  error: None                      │
//! │  success = false  →  value: None,     error: Some({message,code,ctx})  │
//! │                                                                         │
//! │  metadata: { duration_ms, cache_hit }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Error Record
// =============================================================================

/// Serializable failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationError {
    /// Human-readable message.
    pub message: String,
    /// Stable code, see [`CoreError::code`].
    pub code: String,
    /// Structured context (field names, item ids, currencies).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl From<&CoreError> for CalculationError {
    fn from(err: &CoreError) -> Self {
        CalculationError {
            message: err.to_string(),
            code: err.code().to_string(),
            context: err.context(),
        }
    }
}

impl From<CoreError> for CalculationError {
    fn from(err: CoreError) -> Self {
        CalculationError::from(&err)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Timing and provenance of a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationMetadata {
    /// Wall time spent producing the result, in milliseconds.
    pub duration_ms: u64,
    /// True when served from the cache without running the calculator.
    pub cache_hit: bool,
}

// =============================================================================
// Calculation Result
// =============================================================================

/// Outcome of a calculator operation.
///
/// Fields are private so the `value`/`error` exclusivity cannot be broken
/// from outside; build one with [`CalculationResult::ok`],
/// [`CalculationResult::failed`] or `From<CoreResult<T>>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult<T> {
    success: bool,
    value: Option<T>,
    error: Option<CalculationError>,
    #[serde(default)]
    metadata: CalculationMetadata,
}

impl<T> CalculationResult<T> {
    /// Successful result.
    pub fn ok(value: T) -> Self {
        CalculationResult {
            success: true,
            value: Some(value),
            error: None,
            metadata: CalculationMetadata::default(),
        }
    }

    /// Failed result.
    pub fn failed(error: impl Into<CalculationError>) -> Self {
        CalculationResult {
            success: false,
            value: None,
            error: Some(error.into()),
            metadata: CalculationMetadata::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&CalculationError> {
        self.error.as_ref()
    }

    /// Error code when failed, `None` on success.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn metadata(&self) -> CalculationMetadata {
        self.metadata
    }

    /// Replaces the metadata block.
    pub fn with_metadata(mut self, metadata: CalculationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Records elapsed time and cache provenance.
    pub fn with_timing(mut self, elapsed: Duration, cache_hit: bool) -> Self {
        self.metadata = CalculationMetadata {
            duration_ms: elapsed.as_millis().min(u64::MAX as u128) as u64,
            cache_hit,
        };
        self
    }

    /// Converts into a `Result`, dropping metadata.
    pub fn into_result(self) -> Result<T, CalculationError> {
        match (self.value, self.error) {
            (Some(value), None) if self.success => Ok(value),
            (_, Some(error)) => Err(error),
            _ => Err(CalculationError {
                message: "result carries neither value nor error".to_string(),
                code: "COMPUTATION_FAILED".to_string(),
                context: BTreeMap::new(),
            }),
        }
    }

    /// Maps the success value, keeping error and metadata.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CalculationResult<U> {
        CalculationResult {
            success: self.success,
            value: self.value.map(f),
            error: self.error,
            metadata: self.metadata,
        }
    }
}

impl<T> From<CoreResult<T>> for CalculationResult<T> {
    fn from(result: CoreResult<T>) -> Self {
        match result {
            Ok(value) => CalculationResult::ok(value),
            Err(err) => CalculationResult::failed(err),
        }
    }
}
