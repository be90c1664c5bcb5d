//! Typed errors for the drift detection core.
//!
//! Collaborator-facing seams (the [`Collector`](crate::collect::Collector)
//! trait) stay on `anyhow::Result`; the core itself reports through these
//! enums so callers can distinguish a hard gather failure from a
//! persistence problem that still produced a usable change list.

use crate::model::{Category, ChangeRecord};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or persisting the baseline snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted snapshot could not be parsed. The on-disk file is left
    /// untouched; the tracker proceeds as if no baseline exists.
    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replace snapshot {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single category failed to collect this cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("collector timed out after {0:?}")]
    TimedOut(Duration),

    /// Too many previously abandoned collector tasks are still running in
    /// the background; refusing to pile up more.
    #[error("too many outstanding collector tasks")]
    Backlogged,

    #[error("collector task panicked: {0}")]
    Panicked(String),

    /// The collaborator itself returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),
}

/// A gather-level failure: a primary category failed with no baseline to
/// fall back to, so no snapshot could be produced this cycle.
#[derive(Debug, Error)]
#[error("collect {category} inventory: {source}")]
pub struct GatherError {
    pub category: Category,
    #[source]
    pub source: CollectError,
}

/// Errors surfaced by [`ChangeTracker::collect_changes`](crate::ChangeTracker::collect_changes).
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Gather(#[from] GatherError),

    /// The cycle completed and the in-memory baseline advanced, but the new
    /// baseline could not be persisted. `changes` holds the full computed
    /// change list; it is not discarded. The save is retried implicitly on
    /// the next cycle, which persists unconditionally.
    #[error("persist baseline: {source}")]
    Persist {
        changes: Vec<ChangeRecord>,
        #[source]
        source: StoreError,
    },
}
