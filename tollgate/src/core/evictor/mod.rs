//! Removal of buckets for idle clients
//!
//! Without eviction the store grows with every client key ever seen. The
//! [`Evictor`] walks the store and drops buckets whose clients have not been
//! checked for longer than the eviction TTL. A client that comes back after
//! eviction simply starts over with a full bucket.
//!
//! With the `tokio` feature, [`Evictor::spawn`] runs the sweep on a fixed
//! interval as a background task that stops when its [`EvictorHandle`] is shut
//! down or dropped.

use crate::core::store::BucketStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "tokio")]
use tokio::{sync::oneshot, task::JoinHandle, time::MissedTickBehavior};

#[cfg(test)]
mod tests;

/// Outcome of a single sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Buckets removed by this sweep
    pub removed: usize,
    /// Buckets left in the store after the sweep
    pub remaining: usize,
}

/// Idle-client sweeper for a [`BucketStore`]
///
/// # Example
///
/// ```
/// use tollgate::{BucketStore, Evictor, RefillPolicy};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let store = Arc::new(BucketStore::new(RefillPolicy::new(3, Duration::from_secs(1), 1)));
/// let evictor = Evictor::new(store.clone(), Duration::from_secs(90), Duration::from_secs(60));
///
/// let start = Instant::now();
/// let _ = store.get_or_create("idle-client", start);
///
/// let report = evictor.sweep(start + Duration::from_secs(91));
/// assert_eq!(report.removed, 1);
/// assert!(store.is_empty());
/// ```
#[derive(Clone)]
pub struct Evictor {
    store: Arc<BucketStore>,
    ttl: Duration,
    interval: Duration,
}

impl Evictor {
    /// Create an evictor over `store`
    ///
    /// - `ttl`: idle time after which a bucket is removed
    /// - `interval`: time between sweeps when running as a background task
    pub fn new(store: Arc<BucketStore>, ttl: Duration, interval: Duration) -> Self {
        Evictor {
            store,
            ttl,
            interval,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Remove every bucket idle for longer than the TTL at `now`
    ///
    /// The idle check and the removal run under the owning shard's lock, so
    /// a bucket being checked concurrently is either seen with its fresh
    /// last-seen time or not at all.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let ttl = self.ttl;
        let removed = self.store.retain(|_, bucket| !bucket.is_idle(now, ttl));
        let remaining = self.store.len();

        tracing::debug!(removed, remaining, "eviction sweep complete");

        SweepReport { removed, remaining }
    }

    /// Run sweeps in a background task
    ///
    /// The first sweep happens one interval after the call. Must be called
    /// from within a Tokio runtime.
    #[cfg(feature = "tokio")]
    pub fn spawn(self) -> EvictorHandle {
        self.spawn_with(|_| {})
    }

    /// Run sweeps in a background task, reporting each one to `on_sweep`
    #[cfg(feature = "tokio")]
    pub fn spawn_with<F>(self, mut on_sweep: F) -> EvictorHandle
    where
        F: FnMut(SweepReport) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let first = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(first, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                ttl_secs = self.ttl.as_secs(),
                interval_secs = self.interval.as_secs(),
                "evictor started"
            );

            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the handle is dropped
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let report = self.sweep(tokio::time::Instant::now().into_std());
                        on_sweep(report);
                    }
                }
            }

            tracing::info!("evictor stopped");
        });

        EvictorHandle { stop_tx, task }
    }
}

/// Handle to a running evictor task
///
/// Dropping the handle stops the task at its next wake-up; use
/// [`shutdown`](EvictorHandle::shutdown) to also wait for it to finish.
#[cfg(feature = "tokio")]
pub struct EvictorHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[cfg(feature = "tokio")]
impl EvictorHandle {
    /// Signal the task to stop and wait until it has exited
    pub async fn shutdown(self) {
        let EvictorHandle { stop_tx, task } = self;
        // Err only means the task already exited
        let _ = stop_tx.send(());

        if let Err(e) = task.await {
            tracing::error!("Evictor task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
