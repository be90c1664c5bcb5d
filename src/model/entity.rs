//! Tracked entity types, one per category.
//!
//! These are minimal field projections sufficient for change detection, not
//! full inventory records. Every field that participates in identity keys or
//! diffed-field subsets lives here; anything the OS reports beyond this is
//! dropped by the collectors before it reaches the engine.

use serde::{Deserialize, Serialize};

/// An installed software product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uninstall_command: String,
}

/// A system service or daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// running, stopped, failed, ...
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    /// automatic, manual, disabled, unknown
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub startup_type: String,
    /// Service account the daemon runs as, where the OS exposes one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account: String,
}

/// An item launched at login or boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupItem {
    pub name: String,
    /// login_item, launch_agent, registry_run, ...
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub enabled: bool,
}

/// A scheduled task or cron job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schedule: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
}

/// A network interface with one assigned address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAdapter {
    pub interface_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    /// ipv4 or ipv6; one entry exists per address family.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_family: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// A local user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub locked: bool,
}
