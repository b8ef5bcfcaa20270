//! # Cache Configuration
//!
//! Configuration for the computation cache. Read once at construction; the
//! store never re-reads it.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COSTWISE_MAX_ENTRIES=50000                                         │
//! │     COSTWISE_REDIS_URL=redis://cache:6379                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/costwise/cache.toml (Linux)                              │
//! │     ~/Library/Application Support/com.costwise.costwise/cache.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     10k entries, 100 MB, memory only                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cache.toml
//! [store]
//! max_entries = 10000
//! max_memory_mb = 100
//!
//! [external_store]
//! enabled = true
//! url = "redis://127.0.0.1:6379"
//! fallback_to_memory = true
//! connection_timeout_ms = 5000
//!
//! [ttl]
//! financial_secs = 300
//! inventory_secs = 600
//! vendor_secs = 900
//! default_secs = 300
//!
//! [invalidation]
//! enabled = true
//! batch_size = 100
//! max_dependencies = 1000
//! ```
//!
//! Unknown keys in any section are rejected.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};

// =============================================================================
// Cache Category
// =============================================================================

/// TTL tier of a cached result. Chosen by the calculator, never the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Valuations, turnover, carrying cost.
    Financial,
    /// Availability, reorder points, classification.
    Inventory,
    /// Vendor lead times and terms.
    Vendor,
    #[default]
    Default,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Financial => "financial",
            CacheCategory::Inventory => "inventory",
            CacheCategory::Vendor => "vendor",
            CacheCategory::Default => "default",
        }
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// In-memory store bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// Maximum number of live entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Memory budget for serialized values, in MiB.
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: usize,

    /// Number of independently locked shards.
    #[serde(default = "default_shards")]
    pub shards: usize,
}

fn default_max_entries() -> usize {
    10_000
}
fn default_max_memory_mb() -> usize {
    100
}
fn default_shards() -> usize {
    16
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            max_entries: default_max_entries(),
            max_memory_mb: default_max_memory_mb(),
            shards: default_shards(),
        }
    }
}

impl StoreSettings {
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }
}

// =============================================================================
// External Store Settings
// =============================================================================

/// Optional redis backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalStoreSettings {
    #[serde(default)]
    pub enabled: bool,

    /// `redis://` or `rediss://` connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Keep serving from memory when the store is unreachable at startup.
    #[serde(default = "default_true")]
    pub fallback_to_memory: bool,

    /// Upper bound on every external call, connect included.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Prefix applied to every external key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_true() -> bool {
    true
}
fn default_connection_timeout_ms() -> u64 {
    5_000
}
fn default_key_prefix() -> String {
    "costwise".to_string()
}

impl Default for ExternalStoreSettings {
    fn default() -> Self {
        ExternalStoreSettings {
            enabled: false,
            url: None,
            fallback_to_memory: true,
            connection_timeout_ms: default_connection_timeout_ms(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl ExternalStoreSettings {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

// =============================================================================
// TTL Settings
// =============================================================================

/// Time-to-live per [`CacheCategory`], in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtlSettings {
    #[serde(default = "default_financial_ttl")]
    pub financial_secs: u64,
    #[serde(default = "default_inventory_ttl")]
    pub inventory_secs: u64,
    #[serde(default = "default_vendor_ttl")]
    pub vendor_secs: u64,
    #[serde(default = "default_default_ttl")]
    pub default_secs: u64,
}

fn default_financial_ttl() -> u64 {
    300
}
fn default_inventory_ttl() -> u64 {
    600
}
fn default_vendor_ttl() -> u64 {
    900
}
fn default_default_ttl() -> u64 {
    300
}

impl Default for TtlSettings {
    fn default() -> Self {
        TtlSettings {
            financial_secs: default_financial_ttl(),
            inventory_secs: default_inventory_ttl(),
            vendor_secs: default_vendor_ttl(),
            default_secs: default_default_ttl(),
        }
    }
}

impl TtlSettings {
    /// TTL for a category.
    pub fn for_category(&self, category: CacheCategory) -> Duration {
        let secs = match category {
            CacheCategory::Financial => self.financial_secs,
            CacheCategory::Inventory => self.inventory_secs,
            CacheCategory::Vendor => self.vendor_secs,
            CacheCategory::Default => self.default_secs,
        };
        Duration::from_secs(secs)
    }
}

// =============================================================================
// Invalidation & Warming Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvalidationSettings {
    /// When false, invalidation requests are accepted and ignored.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dependencies matched per sweep once `max_dependencies` is exceeded.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Requests above this many dependencies are split into batches.
    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: usize,
}

fn default_batch_size() -> usize {
    100
}
fn default_max_dependencies() -> usize {
    1_000
}

impl Default for InvalidationSettings {
    fn default() -> Self {
        InvalidationSettings {
            enabled: true,
            batch_size: default_batch_size(),
            max_dependencies: default_max_dependencies(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarmingSettings {
    /// Warming tasks run at once.
    #[serde(default = "default_warming_concurrency")]
    pub concurrency: usize,
}

fn default_warming_concurrency() -> usize {
    4
}

impl Default for WarmingSettings {
    fn default() -> Self {
        WarmingSettings {
            concurrency: default_warming_concurrency(),
        }
    }
}

// =============================================================================
// Main Cache Configuration
// =============================================================================

/// Complete cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub external_store: ExternalStoreSettings,

    #[serde(default)]
    pub ttl: TtlSettings,

    #[serde(default)]
    pub invalidation: InvalidationSettings,

    #[serde(default)]
    pub warming: WarmingSettings,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (cache.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CacheResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cache config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load cache config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses and validates a TOML document. No environment overrides.
    pub fn from_toml_str(contents: &str) -> CacheResult<Self> {
        let config: CacheConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CacheResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CacheError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CacheError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Cache config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CacheResult<()> {
        let positive = [
            ("store.max_entries", self.store.max_entries),
            ("store.max_memory_mb", self.store.max_memory_mb),
            ("store.shards", self.store.shards),
            ("invalidation.batch_size", self.invalidation.batch_size),
            ("warming.concurrency", self.warming.concurrency),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CacheError::InvalidConfig(format!("{} must be greater than 0", name)));
            }
        }

        if self.external_store.connection_timeout_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "external_store.connection_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.external_store.enabled {
            match self.external_store.url.as_deref() {
                Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {}
                Some(url) => {
                    return Err(CacheError::InvalidConfig(format!(
                        "external_store.url must start with redis:// or rediss://, got: {}",
                        url
                    )))
                }
                None => {
                    return Err(CacheError::InvalidConfig(
                        "external_store.url is required when the external store is enabled".into(),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            let raw = std::env::var(name).ok()?;
            match raw.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(variable = name, value = %raw, "Ignoring unparseable environment override");
                    None
                }
            }
        }

        if let Some(v) = parsed("COSTWISE_MAX_ENTRIES") {
            debug!(max_entries = v, "Overriding max entries from environment");
            self.store.max_entries = v;
        }
        if let Some(v) = parsed("COSTWISE_MAX_MEMORY_MB") {
            self.store.max_memory_mb = v;
        }

        if let Ok(url) = std::env::var("COSTWISE_REDIS_URL") {
            debug!("Overriding redis URL from environment");
            self.external_store.url = Some(url);
            self.external_store.enabled = true;
        }
        if let Some(v) = parsed("COSTWISE_EXTERNAL_STORE_ENABLED") {
            self.external_store.enabled = v;
        }

        if let Some(v) = parsed("COSTWISE_TTL_FINANCIAL_SECS") {
            self.ttl.financial_secs = v;
        }
        if let Some(v) = parsed("COSTWISE_TTL_INVENTORY_SECS") {
            self.ttl.inventory_secs = v;
        }
        if let Some(v) = parsed("COSTWISE_TTL_VENDOR_SECS") {
            self.ttl.vendor_secs = v;
        }
        if let Some(v) = parsed("COSTWISE_TTL_DEFAULT_SECS") {
            self.ttl.default_secs = v;
        }

        if let Some(v) = parsed("COSTWISE_WARMING_CONCURRENCY") {
            self.warming.concurrency = v;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "costwise", "costwise")
            .map(|dirs| dirs.config_dir().join("cache.toml"))
    }
}
