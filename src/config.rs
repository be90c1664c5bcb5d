//! Configuration for the drift tracker.
//!
//! Settings are sourced from a TOML file, then overridden by environment
//! variables, the same knobs the surrounding agent exposes:
//!
//! - `DRIFTSCAN_COLLECT_TIMEOUT_SECS`: per-category collection timeout
//! - `DRIFTSCAN_IGNORE`: comma-separated `category:pattern` noise rules
//!
//! # Example Configuration
//!
//! ```toml
//! collect_timeout_secs = 8
//! snapshot_path = "/var/lib/driftscan/snapshot.json"
//! ignore = ["software:security intelligence update*", "startup:onedrive*"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-category collection timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// Accepted timeout range; values outside are clamped.
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// Tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the baseline snapshot is persisted. `None` selects the
    /// platform default under the local data directory.
    pub snapshot_path: Option<PathBuf>,

    /// Per-category collection timeout in seconds, clamped to 1..=300.
    ///
    /// Default: 8
    pub collect_timeout_secs: u64,

    /// Noise-suppression rules as `category:pattern` tokens, appended to
    /// the built-in defaults.
    pub ignore: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            collect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ignore: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file, then applies environment
    /// overrides. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("driftscan")
            .join("config.toml")
    }

    /// The collection timeout, clamped to the accepted range.
    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(clamp_timeout_secs(self.collect_timeout_secs))
    }

    /// The configured ignore tokens joined back into the comma-separated
    /// form the noise filter parses.
    pub fn ignore_rules(&self) -> String {
        self.ignore.join(",")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("DRIFTSCAN_COLLECT_TIMEOUT_SECS") {
            if let Some(secs) = parse_timeout_secs(&raw) {
                self.collect_timeout_secs = secs;
            }
        }
        if let Ok(raw) = std::env::var("DRIFTSCAN_IGNORE") {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.ignore.extend(raw.split(',').map(|t| t.trim().to_string()));
            }
        }
    }
}

/// Parses a timeout override; malformed or non-positive input is ignored.
fn parse_timeout_secs(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(secs),
        _ => None,
    }
}

fn clamp_timeout_secs(secs: u64) -> u64 {
    secs.clamp(*TIMEOUT_RANGE_SECS.start(), *TIMEOUT_RANGE_SECS.end())
}
