//! # Cache Error Types
//!
//! Errors raised by cache construction and the external store adapter.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cache Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │ External Store  │  │     Serialization       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Unavailable    │  │  Serialization          │ │
//! │  │  ConfigLoad     │  │  Timeout        │  │                         │ │
//! │  │  ConfigSave     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these reach a `get_or_compute` caller. External store failures on
//! the request path are logged and the store continues memory-only.

use thiserror::Error;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid cache configuration.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // External Store Errors
    // =========================================================================
    /// The external store could not be reached or rejected a command.
    #[error("External store unavailable: {0}")]
    ExternalStoreUnavailable(String),

    /// An external store call exceeded the configured timeout.
    #[error("External store timeout after {0} ms")]
    Timeout(u64),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    /// A value or key payload could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::ExternalStoreUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CacheError {
    fn from(err: toml::de::Error) -> Self {
        CacheError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CacheError {
    fn from(err: toml::ser::Error) -> Self {
        CacheError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CacheError {
    /// Returns true if the cache can keep serving from memory after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::ExternalStoreUnavailable(_) | CacheError::Timeout(_) | CacheError::Serialization(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidConfig(_) | CacheError::ConfigLoadFailed(_) | CacheError::ConfigSaveFailed(_)
        )
    }
}
