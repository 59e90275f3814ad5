//! Registry cache: the process-wide, read-mostly device registry.
//!
//! The current [`RegistrySnapshot`] sits behind an [`ArcSwap`]: a refresh
//! builds the next snapshot off to the side and publishes it with a single
//! pointer swap. Readers never lock, never block the writer, and always see
//! a complete snapshot.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use toad_domain::address::DeviceAddress;
use toad_domain::error::ToadError;
use toad_domain::grid::GridId;
use toad_domain::registry::RegistrySnapshot;
use toad_domain::time::{self, Timestamp};

use crate::ports::{RegistryEntry, RegistrySource};

/// Holder of the current registry snapshot.
pub struct RegistryCache {
    current: ArcSwap<RegistrySnapshot>,
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
        }
    }
}

impl RegistryCache {
    /// Create a cache holding the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot in effect right now.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot wholesale.
    pub fn publish(&self, snapshot: RegistrySnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Fetch the registry from `source` and publish the result.
    ///
    /// Returns the number of entries in the new snapshot. On failure the
    /// previous snapshot stays in effect.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `source`.
    pub async fn refresh<S: RegistrySource>(&self, source: &S) -> Result<usize, ToadError> {
        let entries = source.fetch().await?;
        let snapshot = build_snapshot(entries, time::now());
        let count = snapshot.len();
        self.publish(snapshot);
        Ok(count)
    }

    /// Whether the current snapshot is older than `bound` at `at`.
    ///
    /// A cache that never completed a refresh counts as stale.
    #[must_use]
    pub fn is_stale(&self, bound: Duration, at: Timestamp) -> bool {
        match self.current.load().fetched_at() {
            Some(fetched_at) => time::elapsed(fetched_at, at) > bound,
            None => true,
        }
    }
}

/// Parse raw entries into a snapshot, skipping unreadable addresses.
fn build_snapshot(entries: Vec<RegistryEntry>, fetched_at: Timestamp) -> RegistrySnapshot {
    let parsed = entries.into_iter().filter_map(|entry| {
        match entry.address.parse::<DeviceAddress>() {
            Ok(address) => Some((GridId::new(entry.id), address)),
            Err(err) => {
                tracing::warn!(id = %entry.id, %err, "skipping unreadable registry entry");
                None
            }
        }
    });
    RegistrySnapshot::new(parsed, fetched_at)
}

/// Background task that keeps a [`RegistryCache`] fresh.
pub struct RegistryRefresher<S> {
    cache: Arc<RegistryCache>,
    source: S,
    interval: Duration,
    stale_after: Duration,
}

impl<S: RegistrySource + 'static> RegistryRefresher<S> {
    #[must_use]
    pub fn new(
        cache: Arc<RegistryCache>,
        source: S,
        interval: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            interval,
            stale_after,
        }
    }

    /// Spawn the refresh loop; it ends once `stop` is cancelled.
    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(stop))
    }

    /// Refresh immediately, then once per interval, until `stop` is cancelled.
    ///
    /// A refresh in progress is allowed to finish.
    async fn run(self, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                _ = ticker.tick() => self.iterate().await,
            }
        }
        tracing::debug!("registry refresher stopped");
    }

    /// Run one refresh and report its outcome.
    pub async fn iterate(&self) {
        match self.cache.refresh(&self.source).await {
            Ok(count) => tracing::debug!(count, "registry snapshot refreshed"),
            Err(err) if self.cache.is_stale(self.stale_after, time::now()) => {
                tracing::error!(
                    %err,
                    stale_after_secs = self.stale_after.as_secs(),
                    "registry refresh failed and the snapshot is stale"
                );
            }
            Err(err) => {
                tracing::warn!(%err, "registry refresh failed, keeping previous snapshot");
            }
        }
    }
}
