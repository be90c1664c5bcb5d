pub mod collect;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod model;
pub mod store;
pub mod tracker;

pub use collect::{Collector, CollectorSet, FnCollector, Harness};
pub use config::Config;
pub use error::{CollectError, GatherError, StoreError, TrackerError};
pub use filter::NoiseFilter;
pub use model::{Category, ChangeAction, ChangeRecord, Snapshot};
pub use store::SnapshotStore;
pub use tracker::ChangeTracker;
