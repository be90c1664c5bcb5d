//! Core data model: tracked categories, change records, and snapshots.
//!
//! A [`Snapshot`] is a complete point-in-time record across all six tracked
//! categories, keyed by stable identity strings. The previously adopted
//! snapshot (the baseline) is compared against a freshly gathered one to
//! produce [`ChangeRecord`] values.

mod entity;

pub use entity::{
    NetworkAdapter, ScheduledTask, ServiceInfo, SoftwareItem, StartupItem, UserAccount,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// A tracked aspect of the managed machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Software,
    Service,
    Startup,
    Network,
    ScheduledTask,
    UserAccount,
}

/// How a category tolerates collection failure.
///
/// Primary categories are the main trend signals: losing one entirely would
/// corrupt downstream analytics, so without a baseline to fall back on the
/// whole gather fails. Supplementary categories tolerate transient gaps and
/// degrade to an empty mapping instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Supplementary,
}

impl Category {
    /// All six categories, in diff order.
    pub const ALL: [Category; 6] = [
        Category::Software,
        Category::Service,
        Category::Startup,
        Category::Network,
        Category::ScheduledTask,
        Category::UserAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Software => "software",
            Category::Service => "service",
            Category::Startup => "startup",
            Category::Network => "network",
            Category::ScheduledTask => "scheduled_task",
            Category::UserAccount => "user_account",
        }
    }

    /// The failure-fallback tier this category belongs to.
    pub fn tier(&self) -> Tier {
        match self {
            Category::Software | Category::Network => Tier::Primary,
            Category::Service
            | Category::Startup
            | Category::ScheduledTask
            | Category::UserAccount => Tier::Supplementary,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "software" => Ok(Category::Software),
            "service" => Ok(Category::Service),
            "startup" => Ok(Category::Startup),
            "network" => Ok(Category::Network),
            "scheduled_task" => Ok(Category::ScheduledTask),
            "user_account" => Ok(Category::UserAccount),
            _ => Err(()),
        }
    }
}

/// The kind of detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Removed,
    Modified,
    /// A version bump of an otherwise identical entity (software only).
    Updated,
}

/// A single detected change, produced fresh every cycle and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub action: ChangeAction,
    /// Human-readable name of the changed entity.
    pub subject: String,
    /// Projection of the relevant fields before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Map<String, Value>>,
    /// Projection of the relevant fields after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Map<String, Value>>,
    /// Extra detail fields (e.g. which field of a service changed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

/// A complete point-in-time record of all tracked categories.
///
/// Every map is `#[serde(default)]`, so all six are present after
/// deserialization even if the persisted file omitted some, and diff logic
/// never needs missing-map guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub software: HashMap<String, SoftwareItem>,
    #[serde(default)]
    pub services: HashMap<String, ServiceInfo>,
    #[serde(default)]
    pub startup_items: HashMap<String, StartupItem>,
    #[serde(default)]
    pub network_adapters: HashMap<String, NetworkAdapter>,
    #[serde(default)]
    pub scheduled_tasks: HashMap<String, ScheduledTask>,
    #[serde(default)]
    pub user_accounts: HashMap<String, UserAccount>,
}

impl Snapshot {
    /// An empty snapshot taken at `timestamp`.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            software: HashMap::new(),
            services: HashMap::new(),
            startup_items: HashMap::new(),
            network_adapters: HashMap::new(),
            scheduled_tasks: HashMap::new(),
            user_accounts: HashMap::new(),
        }
    }
}
