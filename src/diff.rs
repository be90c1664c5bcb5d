//! Entity keying and change computation.
//!
//! Each tracked entity type implements [`Tracked`], which fixes three
//! category-specific contracts behind one generic driver:
//!
//! - **Identity key**: derived only from fields that identify the same
//!   real-world entity across observations, case-normalized and trimmed.
//!   Fields that legitimately fluctuate between two observations of one
//!   unchanged entity (e.g. an install path enumerated in non-deterministic
//!   order) must stay out of the key, or the entity flickers as a
//!   remove+add pair.
//! - **State projection**: the fields carried on `added`/`removed` records.
//! - **Mutable-field subset**: the only fields whose difference produces a
//!   `modified` (or `updated`) record. Volatile metadata outside this
//!   subset never triggers a record even when it differs.
//!
//! [`diff_category`] compares one baseline map against one current map and
//! emits records with no ordering guarantee.

use crate::model::{
    Category, ChangeAction, ChangeRecord, NetworkAdapter, ScheduledTask, ServiceInfo,
    SoftwareItem, StartupItem, UserAccount,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Separator for identity key segments; unlikely to appear in real data
/// after normalization.
const KEY_SEPARATOR: &str = "|";

/// Lowercases and trims a field for keying and comparison against noise
/// rules.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// One detected in-place change of an entity that exists in both snapshots.
pub struct Modification {
    pub action: ChangeAction,
    pub before: Map<String, Value>,
    pub after: Map<String, Value>,
    pub details: Option<Map<String, Value>>,
}

/// A tracked entity type: stable identity, display subject, and the fixed
/// field subsets driving change detection.
pub trait Tracked: Clone {
    const CATEGORY: Category;

    /// Deterministic identity key matching "the same" entity across two
    /// snapshots.
    fn key(&self) -> String;

    /// Human-readable subject for emitted records.
    fn subject(&self) -> String;

    /// Field projection carried as `after` on added records and `before`
    /// on removed records.
    fn state(&self) -> Map<String, Value>;

    /// Compares the mutable-field subset against an older observation of
    /// the same entity. Empty when nothing tracked changed.
    fn modifications(&self, old: &Self) -> Vec<Modification>;
}

fn fields(pairs: Vec<(&str, Value)>) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl Tracked for SoftwareItem {
    const CATEGORY: Category = Category::Software;

    /// name + vendor. Install location and uninstall command are carried
    /// for reporting but deliberately excluded from the key: Windows
    /// enumerates registry subkeys in non-deterministic order and returns
    /// different metadata for the same product between runs, and keying on
    /// either field made every such fluctuation look like a remove+add
    /// pair. Vendor still separates same-named products from different
    /// publishers.
    fn key(&self) -> String {
        [normalize(&self.name), normalize(&self.vendor)].join(KEY_SEPARATOR)
    }

    fn subject(&self) -> String {
        if self.name.trim().is_empty() {
            "unknown software".to_string()
        } else {
            self.name.clone()
        }
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("name", json!(self.name)),
            ("version", json!(self.version)),
            ("vendor", json!(self.vendor)),
            ("install_location", json!(self.install_location)),
        ])
    }

    /// Only the version is diffed; a version bump is reported as `updated`.
    fn modifications(&self, old: &Self) -> Vec<Modification> {
        if self.version == old.version {
            return Vec::new();
        }
        vec![Modification {
            action: ChangeAction::Updated,
            before: fields(vec![("version", json!(old.version))]),
            after: fields(vec![("version", json!(self.version))]),
            details: None,
        }]
    }
}

impl Tracked for ServiceInfo {
    const CATEGORY: Category = Category::Service;

    fn key(&self) -> String {
        normalize(&self.name)
    }

    fn subject(&self) -> String {
        if !self.display_name.trim().is_empty() {
            self.display_name.clone()
        } else if !self.name.trim().is_empty() {
            self.name.clone()
        } else {
            "unknown service".to_string()
        }
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("state", json!(self.state)),
            ("startup_type", json!(self.startup_type)),
            ("account", json!(self.account)),
        ])
    }

    /// Startup type and account are diffed as separate records, each
    /// naming the changed field in `details`. Runtime state (running vs.
    /// stopped) is deliberately not diffed; it flips constantly.
    fn modifications(&self, old: &Self) -> Vec<Modification> {
        let mut changes = Vec::new();
        if self.startup_type != old.startup_type {
            changes.push(Modification {
                action: ChangeAction::Modified,
                before: fields(vec![("startup_type", json!(old.startup_type))]),
                after: fields(vec![("startup_type", json!(self.startup_type))]),
                details: Some(fields(vec![("field", json!("startup_type"))])),
            });
        }
        if self.account != old.account {
            changes.push(Modification {
                action: ChangeAction::Modified,
                before: fields(vec![("account", json!(old.account))]),
                after: fields(vec![("account", json!(self.account))]),
                details: Some(fields(vec![("field", json!("service_account"))])),
            });
        }
        changes
    }
}

impl Tracked for StartupItem {
    const CATEGORY: Category = Category::Startup;

    fn key(&self) -> String {
        [
            normalize(&self.name),
            normalize(&self.kind),
            normalize(&self.path),
        ]
        .join(KEY_SEPARATOR)
    }

    fn subject(&self) -> String {
        if self.name.trim().is_empty() {
            "unknown startup item".to_string()
        } else {
            self.name.clone()
        }
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("kind", json!(self.kind)),
            ("path", json!(self.path)),
            ("enabled", json!(self.enabled)),
        ])
    }

    fn modifications(&self, old: &Self) -> Vec<Modification> {
        if self.path == old.path && self.enabled == old.enabled && self.kind == old.kind {
            return Vec::new();
        }
        vec![Modification {
            action: ChangeAction::Modified,
            before: old.state(),
            after: self.state(),
            details: None,
        }]
    }
}

impl Tracked for NetworkAdapter {
    const CATEGORY: Category = Category::Network;

    fn key(&self) -> String {
        [
            normalize(&self.interface_name),
            normalize(&self.ip_family),
            normalize(&self.mac_address),
        ]
        .join(KEY_SEPARATOR)
    }

    fn subject(&self) -> String {
        self.interface_name.clone()
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("ip_address", json!(self.ip_address)),
            ("mac_address", json!(self.mac_address)),
            ("ip_family", json!(self.ip_family)),
            ("is_primary", json!(self.is_primary)),
        ])
    }

    fn modifications(&self, old: &Self) -> Vec<Modification> {
        if self.ip_address == old.ip_address
            && self.mac_address == old.mac_address
            && self.is_primary == old.is_primary
        {
            return Vec::new();
        }
        vec![Modification {
            action: ChangeAction::Modified,
            before: old.state(),
            after: self.state(),
            details: None,
        }]
    }
}

impl Tracked for ScheduledTask {
    const CATEGORY: Category = Category::ScheduledTask;

    fn key(&self) -> String {
        [normalize(&self.name), normalize(&self.path)].join(KEY_SEPARATOR)
    }

    fn subject(&self) -> String {
        if self.name.trim().is_empty() {
            "unknown scheduled task".to_string()
        } else {
            self.name.clone()
        }
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("path", json!(self.path)),
            ("status", json!(self.status)),
            ("schedule", json!(self.schedule)),
            ("command", json!(self.command)),
        ])
    }

    fn modifications(&self, old: &Self) -> Vec<Modification> {
        if self.status == old.status
            && self.schedule == old.schedule
            && self.command == old.command
            && self.path == old.path
        {
            return Vec::new();
        }
        vec![Modification {
            action: ChangeAction::Modified,
            before: old.state(),
            after: self.state(),
            details: None,
        }]
    }
}

impl Tracked for UserAccount {
    const CATEGORY: Category = Category::UserAccount;

    fn key(&self) -> String {
        normalize(&self.username)
    }

    fn subject(&self) -> String {
        self.username.clone()
    }

    fn state(&self) -> Map<String, Value> {
        fields(vec![
            ("full_name", json!(self.full_name)),
            ("disabled", json!(self.disabled)),
            ("locked", json!(self.locked)),
        ])
    }

    fn modifications(&self, old: &Self) -> Vec<Modification> {
        if self.full_name == old.full_name
            && self.disabled == old.disabled
            && self.locked == old.locked
        {
            return Vec::new();
        }
        vec![Modification {
            action: ChangeAction::Modified,
            before: old.state(),
            after: self.state(),
            details: None,
        }]
    }
}

/// Builds a keyed map from a list of collected entities.
pub fn key_items<T: Tracked>(items: Vec<T>) -> HashMap<String, T> {
    items.into_iter().map(|item| (item.key(), item)).collect()
}

/// Compares one category's baseline map against its current map.
///
/// Keys present only in `current` emit `added` with the after-state; keys
/// present only in `baseline` emit `removed` with the before-state; keys
/// present in both emit whatever [`Tracked::modifications`] reports.
pub fn diff_category<T: Tracked>(
    now: DateTime<Utc>,
    baseline: &HashMap<String, T>,
    current: &HashMap<String, T>,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    for (key, item) in current {
        match baseline.get(key) {
            None => changes.push(ChangeRecord {
                timestamp: now,
                category: T::CATEGORY,
                action: ChangeAction::Added,
                subject: item.subject(),
                before: None,
                after: Some(item.state()),
                details: None,
            }),
            Some(old) => {
                for m in item.modifications(old) {
                    changes.push(ChangeRecord {
                        timestamp: now,
                        category: T::CATEGORY,
                        action: m.action,
                        subject: item.subject(),
                        before: Some(m.before),
                        after: Some(m.after),
                        details: m.details,
                    });
                }
            }
        }
    }

    for (key, old) in baseline {
        if !current.contains_key(key) {
            changes.push(ChangeRecord {
                timestamp: now,
                category: T::CATEGORY,
                action: ChangeAction::Removed,
                subject: old.subject(),
                before: Some(old.state()),
                after: None,
                details: None,
            });
        }
    }

    changes
}

/// Diffs all six categories of two snapshots and concatenates the results.
pub fn diff_snapshots(
    now: DateTime<Utc>,
    baseline: &crate::model::Snapshot,
    current: &crate::model::Snapshot,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::with_capacity(16);
    changes.extend(diff_category(now, &baseline.software, &current.software));
    changes.extend(diff_category(now, &baseline.services, &current.services));
    changes.extend(diff_category(
        now,
        &baseline.startup_items,
        &current.startup_items,
    ));
    changes.extend(diff_category(
        now,
        &baseline.network_adapters,
        &current.network_adapters,
    ));
    changes.extend(diff_category(
        now,
        &baseline.scheduled_tasks,
        &current.scheduled_tasks,
    ));
    changes.extend(diff_category(
        now,
        &baseline.user_accounts,
        &current.user_accounts,
    ));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome(version: &str) -> SoftwareItem {
        SoftwareItem {
            name: "Google Chrome".to_string(),
            version: version.to_string(),
            vendor: "Google".to_string(),
            ..Default::default()
        }
    }

    fn eth0() -> NetworkAdapter {
        NetworkAdapter {
            interface_name: "eth0".to_string(),
            mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            ip_address: "10.0.0.20".to_string(),
            ip_family: "ipv4".to_string(),
            is_primary: true,
        }
    }

    #[test]
    fn software_key_stable_across_install_location_variants() {
        // Regression guard for the false remove+add cycle caused by
        // non-deterministic registry enumeration returning different
        // metadata for the same product.
        let with_location = SoftwareItem {
            install_location: "C:\\Windows\\System32".to_string(),
            ..chrome("121.0.0")
        };
        let with_uninstall = SoftwareItem {
            uninstall_command: "MsiExec.exe /X{EA8A9D62-5D82-3AD9-B1C7-D4DB73BE5791}".to_string(),
            ..chrome("121.0.0")
        };
        let with_neither = chrome("121.0.0");
        assert_eq!(with_location.key(), with_uninstall.key());
        assert_eq!(with_uninstall.key(), with_neither.key());
        assert_eq!(chrome("121.0.0").key(), chrome("122.0.0").key());
    }

    #[test]
    fn software_key_distinguishes_vendors() {
        let other_vendor = SoftwareItem {
            vendor: "Chromium Authors".to_string(),
            ..chrome("121.0.0")
        };
        assert_ne!(chrome("121.0.0").key(), other_vendor.key());
    }

    #[test]
    fn software_key_normalizes_case_and_whitespace() {
        let shouty = SoftwareItem {
            name: "  GOOGLE CHROME ".to_string(),
            vendor: "google".to_string(),
            ..Default::default()
        };
        assert_eq!(shouty.key(), chrome("121.0.0").key());
    }

    #[test]
    fn version_bump_yields_single_updated_record() {
        let baseline = key_items(vec![chrome("121.0.0")]);
        let current = key_items(vec![chrome("122.0.0")]);

        let changes = diff_category(Utc::now(), &baseline, &current);
        assert_eq!(changes.len(), 1);
        let record = &changes[0];
        assert_eq!(record.category, Category::Software);
        assert_eq!(record.action, ChangeAction::Updated);
        assert_eq!(record.subject, "Google Chrome");
        assert_eq!(
            record.before.as_ref().unwrap()["version"],
            json!("121.0.0")
        );
        assert_eq!(record.after.as_ref().unwrap()["version"], json!("122.0.0"));
    }

    #[test]
    fn metadata_fluctuation_produces_no_records() {
        let with_uninstall = SoftwareItem {
            uninstall_command: "msiexec /x {guid}".to_string(),
            ..chrome("121.0.0")
        };
        let with_location = SoftwareItem {
            install_location: "C:\\Windows\\System32".to_string(),
            ..chrome("121.0.0")
        };
        let changes = diff_category(
            Utc::now(),
            &key_items(vec![with_uninstall]),
            &key_items(vec![with_location]),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn removed_entity_yields_exactly_one_removed_record() {
        let slack = StartupItem {
            name: "Slack".to_string(),
            kind: "login_item".to_string(),
            path: "/Applications/Slack.app".to_string(),
            enabled: true,
        };
        let baseline = key_items(vec![slack]);
        let current = HashMap::new();

        let changes = diff_category(Utc::now(), &baseline, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, Category::Startup);
        assert_eq!(changes[0].action, ChangeAction::Removed);
        assert_eq!(changes[0].subject, "Slack");
        assert!(changes[0].before.is_some());
        assert!(changes[0].after.is_none());
    }

    #[test]
    fn added_adapter_reported_unchanged_adapter_silent() {
        let wlan0 = NetworkAdapter {
            interface_name: "wlan0".to_string(),
            mac_address: "11:22:33:44:55:66".to_string(),
            ip_address: "10.0.0.30".to_string(),
            ip_family: "ipv4".to_string(),
            is_primary: false,
        };
        let baseline = key_items(vec![eth0()]);
        let current = key_items(vec![eth0(), wlan0]);

        let changes = diff_category(Utc::now(), &baseline, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Added);
        assert_eq!(changes[0].subject, "wlan0");
    }

    #[test]
    fn service_account_and_startup_type_changes_are_separate_records() {
        let old = ServiceInfo {
            name: "Spooler".to_string(),
            display_name: "Print Spooler".to_string(),
            state: "running".to_string(),
            startup_type: "automatic".to_string(),
            account: "LocalSystem".to_string(),
        };
        let new = ServiceInfo {
            startup_type: "disabled".to_string(),
            account: "NetworkService".to_string(),
            ..old.clone()
        };

        let changes = diff_category(Utc::now(), &key_items(vec![old]), &key_items(vec![new]));
        assert_eq!(changes.len(), 2);
        for record in &changes {
            assert_eq!(record.action, ChangeAction::Modified);
            assert_eq!(record.subject, "Print Spooler");
        }
        let detail_fields: Vec<&Value> = changes
            .iter()
            .map(|c| &c.details.as_ref().unwrap()["field"])
            .collect();
        assert!(detail_fields.contains(&&json!("startup_type")));
        assert!(detail_fields.contains(&&json!("service_account")));
    }

    #[test]
    fn service_state_flip_is_not_a_change() {
        let running = ServiceInfo {
            name: "sshd".to_string(),
            state: "running".to_string(),
            startup_type: "automatic".to_string(),
            ..Default::default()
        };
        let stopped = ServiceInfo {
            state: "stopped".to_string(),
            ..running.clone()
        };
        let changes = diff_category(
            Utc::now(),
            &key_items(vec![running]),
            &key_items(vec![stopped]),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn user_account_lock_is_modified() {
        let alice = UserAccount {
            username: "alice".to_string(),
            full_name: "Alice".to_string(),
            disabled: false,
            locked: false,
        };
        let locked = UserAccount {
            locked: true,
            ..alice.clone()
        };
        let changes = diff_category(
            Utc::now(),
            &key_items(vec![alice]),
            &key_items(vec![locked]),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Modified);
        assert_eq!(changes[0].after.as_ref().unwrap()["locked"], json!(true));
    }

    #[test]
    fn identical_snapshots_diff_to_nothing() {
        let mut baseline = crate::model::Snapshot::empty(Utc::now());
        baseline.software = key_items(vec![chrome("121.0.0")]);
        baseline.network_adapters = key_items(vec![eth0()]);
        let current = baseline.clone();
        assert!(diff_snapshots(Utc::now(), &baseline, &current).is_empty());
    }
}
