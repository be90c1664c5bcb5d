//! Concurrent collection of the six tracked categories.
//!
//! The [`Harness`] fans out one [`Collector`] per category as parallel
//! tokio tasks, each raced against an independent timeout, then merges the
//! results into a [`Snapshot`] keyed by [`Tracked::key`]. Failures resolve
//! per the category's [`Tier`]: fall back to the baseline mapping where one
//! exists, otherwise fail the whole gather (primary) or degrade to an
//! empty mapping (supplementary).
//!
//! # Abandonment, not cancellation
//!
//! A collector that overruns its timeout is abandoned, not killed: the
//! spawned task keeps running in the background until its own blocking
//! call returns. Collectors should honor the timeout themselves and return
//! partial or empty results rather than hang. To bound the damage from
//! ones that don't, each task holds a permit from a fixed-size semaphore
//! until it truly finishes; once the ceiling of outstanding abandoned
//! tasks is reached, further collection attempts fail fast with
//! [`CollectError::Backlogged`] instead of piling up unbounded background
//! work.

use crate::diff::{key_items, Tracked};
use crate::error::{CollectError, GatherError};
use crate::model::{
    NetworkAdapter, ScheduledTask, ServiceInfo, Snapshot, SoftwareItem, StartupItem, Tier,
    UserAccount,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Default per-category collection timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Maximum number of abandoned collector tasks allowed to keep running in
/// the background before new collections are refused.
const ABANDONED_TASK_CEILING: usize = 32;

/// An inventory enumerator for one category.
///
/// Implementations are expected to return partial or empty results rather
/// than hang indefinitely; the harness only stops waiting past the
/// timeout, it cannot interrupt a stuck call.
#[async_trait]
pub trait Collector<T>: Send + Sync {
    async fn collect(&self) -> Result<Vec<T>>;
}

/// Adapter turning an async closure into a [`Collector`].
///
/// ```
/// use driftscan::collect::{Collector, FnCollector};
/// use driftscan::model::UserAccount;
///
/// let users = FnCollector(|| async { anyhow::Ok(vec![UserAccount::default()]) });
/// # let _: &dyn Collector<UserAccount> = &users;
/// ```
pub struct FnCollector<F>(pub F);

#[async_trait]
impl<T, F, Fut> Collector<T> for FnCollector<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    async fn collect(&self) -> Result<Vec<T>> {
        (self.0)().await
    }
}

/// The six category collectors consumed by the harness.
#[derive(Clone)]
pub struct CollectorSet {
    pub software: Arc<dyn Collector<SoftwareItem>>,
    pub services: Arc<dyn Collector<ServiceInfo>>,
    pub startup_items: Arc<dyn Collector<StartupItem>>,
    pub network_adapters: Arc<dyn Collector<NetworkAdapter>>,
    pub scheduled_tasks: Arc<dyn Collector<ScheduledTask>>,
    pub user_accounts: Arc<dyn Collector<UserAccount>>,
}

/// Runs the collectors concurrently and assembles the current snapshot.
pub struct Harness {
    collectors: CollectorSet,
    timeout: Duration,
    outstanding: Arc<Semaphore>,
}

impl Harness {
    /// A zero timeout falls back to [`DEFAULT_TIMEOUT`].
    pub fn new(collectors: CollectorSet, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        Self {
            collectors,
            timeout,
            outstanding: Arc::new(Semaphore::new(ABANDONED_TASK_CEILING)),
        }
    }

    /// Gathers all six categories concurrently into a fresh snapshot.
    ///
    /// `baseline` supplies the fallback mappings for categories that fail
    /// this cycle. The call returns only once every category has reached a
    /// resolved state (success, fallback, or empty); there is no streaming
    /// of partial results. An error means a primary category failed with
    /// no baseline to substitute, and no snapshot was produced.
    pub async fn gather(&self, baseline: Option<&Snapshot>) -> Result<Snapshot, GatherError> {
        let (software, services, startup_items, network_adapters, scheduled_tasks, user_accounts) =
            tokio::join!(
                self.run(&self.collectors.software),
                self.run(&self.collectors.services),
                self.run(&self.collectors.startup_items),
                self.run(&self.collectors.network_adapters),
                self.run(&self.collectors.scheduled_tasks),
                self.run(&self.collectors.user_accounts),
            );

        let mut snapshot = Snapshot::empty(Utc::now());
        snapshot.software = resolve(software, baseline.map(|b| &b.software))?;
        snapshot.services = resolve(services, baseline.map(|b| &b.services))?;
        snapshot.startup_items = resolve(startup_items, baseline.map(|b| &b.startup_items))?;
        snapshot.network_adapters =
            resolve(network_adapters, baseline.map(|b| &b.network_adapters))?;
        snapshot.scheduled_tasks = resolve(scheduled_tasks, baseline.map(|b| &b.scheduled_tasks))?;
        snapshot.user_accounts = resolve(user_accounts, baseline.map(|b| &b.user_accounts))?;
        Ok(snapshot)
    }

    /// Races one collector against the per-category timeout.
    ///
    /// The collector runs inside a spawned task that holds an outstanding
    /// permit until it actually finishes, even if the harness stopped
    /// waiting long ago.
    async fn run<T: Send + 'static>(
        &self,
        collector: &Arc<dyn Collector<T>>,
    ) -> Result<Vec<T>, CollectError> {
        let permit = match Arc::clone(&self.outstanding).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return Err(CollectError::Backlogged),
        };

        let collector = Arc::clone(collector);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            collector.collect().await
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result.map_err(CollectError::Failed),
            Ok(Err(join_err)) => Err(CollectError::Panicked(join_err.to_string())),
            // The task keeps running; only the wait is abandoned.
            Err(_) => Err(CollectError::TimedOut(self.timeout)),
        }
    }
}

/// Applies the tier policy to one category's collection result and keys
/// the surviving items.
fn resolve<T: Tracked>(
    result: Result<Vec<T>, CollectError>,
    baseline: Option<&HashMap<String, T>>,
) -> Result<HashMap<String, T>, GatherError> {
    let err = match result {
        Ok(items) => return Ok(key_items(items)),
        Err(err) => err,
    };

    if let Some(previous) = baseline {
        warn!(
            category = %T::CATEGORY,
            error = %err,
            "collection failed, using previous snapshot"
        );
        return Ok(previous.clone());
    }

    match T::CATEGORY.tier() {
        Tier::Primary => Err(GatherError {
            category: T::CATEGORY,
            source: err,
        }),
        Tier::Supplementary => {
            warn!(
                category = %T::CATEGORY,
                error = %err,
                "collection failed with no baseline, leaving category empty"
            );
            Ok(HashMap::new())
        }
    }
}
