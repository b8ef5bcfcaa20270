//! # Dependencies & Invalidation Requests
//!
//! A [`CacheDependency`] names a piece of source data a cached result was
//! derived from. Dependencies never take part in the key; they only decide
//! which entries an invalidation request or a version change kills.
//!
//! ## Matching Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stored dep           request dep           match?                      │
//! │  ───────────────────  ───────────────────   ──────                      │
//! │  entity:item:42       entity:item:42        yes                         │
//! │  entity:item:42@5     entity:item:42        yes  (missing = wildcard)   │
//! │  entity:item:42@5     entity:item:42@5      yes                         │
//! │  entity:item:42@5     entity:item:42@6      no                          │
//! │  entity:item:42       table:item:42         no   (kind differs)         │
//! │                                                                         │
//! │  entry invalidated ⇔ ANY stored dep matches ANY request dep             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On lookup the rule is inverted: an entry whose stored dependency carries a
//! version different from the caller's current version for the same target
//! is stale and is treated as a miss.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Well-known Dependency Targets
// =============================================================================

/// Entity prefix for a single inventory item record.
pub const INVENTORY_ITEM: &str = "inventory_item";
/// Entity prefix for an item's transaction history.
pub const INVENTORY_TRANSACTIONS: &str = "inventory_transactions";
/// Table holding inventory items.
pub const INVENTORY_ITEMS_TABLE: &str = "inventory_items";
/// Table holding inventory transactions.
pub const INVENTORY_TRANSACTIONS_TABLE: &str = "inventory_transactions";
/// Cross-cutting costing method setting.
pub const COSTING_METHOD_FIELD: &str = "costing_method";

// =============================================================================
// Dependency
// =============================================================================

/// Granularity of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// A whole table, e.g. `inventory_items`.
    Table,
    /// One record, e.g. `inventory_item:42`.
    Entity,
    /// A cross-cutting attribute, e.g. `costing_method`.
    Field,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Table => "table",
            DependencyKind::Entity => "entity",
            DependencyKind::Field => "field",
        }
    }
}

/// One piece of data a cached result depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheDependency {
    pub kind: DependencyKind,
    pub identifier: String,
    /// Compared verbatim when both sides carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CacheDependency {
    pub fn new(kind: DependencyKind, identifier: impl Into<String>) -> Self {
        CacheDependency {
            kind,
            identifier: identifier.into(),
            version: None,
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(DependencyKind::Table, name)
    }

    pub fn entity(identifier: impl Into<String>) -> Self {
        Self::new(DependencyKind::Entity, identifier)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(DependencyKind::Field, name)
    }

    /// `entity:inventory_item:<id>`
    pub fn inventory_item(item_id: &str) -> Self {
        Self::entity(format!("{}:{}", INVENTORY_ITEM, item_id))
    }

    /// `entity:inventory_transactions:<id>`
    pub fn inventory_transactions(item_id: &str) -> Self {
        Self::entity(format!("{}:{}", INVENTORY_TRANSACTIONS, item_id))
    }

    pub fn with_version(mut self, version: impl ToString) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Same kind and identifier, versions ignored.
    pub fn same_target(&self, other: &CacheDependency) -> bool {
        self.kind == other.kind && self.identifier == other.identifier
    }

    /// Invalidation match: same target and, when both are versioned, same version.
    pub fn matches(&self, other: &CacheDependency) -> bool {
        if !self.same_target(other) {
            return false;
        }
        match (&self.version, &other.version) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        }
    }

    /// True when `current` names the same target with a different version.
    pub fn is_stale_against(&self, current: &CacheDependency) -> bool {
        if !self.same_target(current) {
            return false;
        }
        matches!((&self.version, &current.version), (Some(stored), Some(now)) if stored != now)
    }
}

impl fmt::Display for CacheDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.identifier)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

/// True if any stored dependency is outdated by any current one.
pub fn any_stale(stored: &[CacheDependency], current: &[CacheDependency]) -> bool {
    stored
        .iter()
        .any(|dep| current.iter().any(|now| dep.is_stale_against(now)))
}

/// True if any stored dependency matches any requested one.
pub fn any_match(stored: &[CacheDependency], requested: &[CacheDependency]) -> bool {
    stored
        .iter()
        .any(|dep| requested.iter().any(|req| dep.matches(req)))
}

// =============================================================================
// Invalidation Request
// =============================================================================

/// A set of changed dependencies, consumed once by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationRequest {
    pub dependencies: Vec<CacheDependency>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl InvalidationRequest {
    pub fn new(dependencies: Vec<CacheDependency>, reason: impl Into<String>) -> Self {
        InvalidationRequest {
            dependencies,
            reason: reason.into(),
            timestamp: Utc::now(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Stock levels of one item changed.
    pub fn stock_changed(item_id: &str) -> Self {
        Self::new(
            vec![CacheDependency::inventory_item(item_id)],
            format!("stock levels changed for item {}", item_id),
        )
    }

    /// Transactions were recorded against one item.
    pub fn transactions_changed(item_id: &str) -> Self {
        Self::new(
            vec![
                CacheDependency::inventory_transactions(item_id),
                CacheDependency::table(INVENTORY_TRANSACTIONS_TABLE),
            ],
            format!("transactions changed for item {}", item_id),
        )
    }

    /// The organisation-wide costing method changed.
    pub fn costing_method_changed() -> Self {
        Self::new(
            vec![CacheDependency::field(COSTING_METHOD_FIELD)],
            "costing method changed",
        )
    }

    /// Any row of `table` changed.
    pub fn table_changed(table: &str) -> Self {
        Self::new(
            vec![CacheDependency::table(table)],
            format!("table {} changed", table),
        )
    }
}
