//! The change tracker orchestrator.
//!
//! [`ChangeTracker`] is the public entry point of the crate. Each call to
//! [`collect_changes`](ChangeTracker::collect_changes) runs one full cycle:
//! gather the current snapshot, diff it against the baseline, suppress
//! configured noise, adopt the current snapshot as the new baseline, and
//! persist it. The whole cycle is serialized by one async mutex, so
//! concurrent callers block until the prior cycle finishes and no two
//! cycles ever interleave. The baseline is owned exclusively here.

use crate::collect::{CollectorSet, Harness};
use crate::config::Config;
use crate::diff::diff_snapshots;
use crate::error::TrackerError;
use crate::filter::NoiseFilter;
use crate::model::{ChangeRecord, Snapshot};
use crate::store::SnapshotStore;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct TrackerState {
    store: SnapshotStore,
    baseline: Option<Snapshot>,
    loaded: bool,
}

/// Detects inventory drift between collection cycles.
pub struct ChangeTracker {
    state: Mutex<TrackerState>,
    harness: Harness,
    filter: NoiseFilter,
}

impl ChangeTracker {
    /// Builds a tracker from an injected store, the six category
    /// collectors, and configuration.
    pub fn new(store: SnapshotStore, collectors: CollectorSet, config: &Config) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                store,
                baseline: None,
                loaded: false,
            }),
            harness: Harness::new(collectors, config.collect_timeout()),
            filter: NoiseFilter::with_rules(&config.ignore_rules()),
        }
    }

    /// Runs one collection cycle and returns the detected changes.
    ///
    /// The first successful cycle against an empty store adopts the
    /// current state as the baseline and returns an empty list; the first
    /// run is defined to report nothing.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Gather`]: a primary category failed with no
    ///   baseline to fall back to; no baseline was adopted, retry next
    ///   cycle.
    /// - [`TrackerError::Persist`]: the cycle completed but the new
    ///   baseline could not be written. The error carries the computed
    ///   change list, and the in-memory baseline stays advanced; the next
    ///   cycle re-persists regardless.
    pub async fn collect_changes(&self) -> Result<Vec<ChangeRecord>, TrackerError> {
        let mut state = self.state.lock().await;

        // Baseline is loaded from disk once per process lifetime.
        if !state.loaded {
            state.loaded = true;
            match state.store.load() {
                Ok(baseline) => state.baseline = baseline,
                Err(err) => {
                    warn!(error = %err, "baseline unreadable, starting without one");
                    state.baseline = None;
                }
            }
        }

        let current = self.harness.gather(state.baseline.as_ref()).await?;

        let Some(baseline) = state.baseline.take() else {
            debug!("no baseline, adopting current snapshot");
            let saved = state.store.save(&current);
            state.baseline = Some(current);
            return match saved {
                Ok(()) => Ok(Vec::new()),
                Err(source) => Err(TrackerError::Persist {
                    changes: Vec::new(),
                    source,
                }),
            };
        };

        let changes = diff_snapshots(Utc::now(), &baseline, &current);
        let changes = self.filter.apply(changes);

        // The in-memory baseline advances whether or not the save lands;
        // the next cycle persists unconditionally, retrying a failed save.
        let saved = state.store.save(&current);
        state.baseline = Some(current);
        match saved {
            Ok(()) => Ok(changes),
            Err(source) => Err(TrackerError::Persist { changes, source }),
        }
    }
}
