//! Background refresh loop.
//!
//! The poller is the only writer to the [`SnapshotStore`]. Every tick it asks
//! the node selector for a standby-preferred node, fetches the complete
//! membership list, and swaps in a fresh snapshot. A failed attempt is logged
//! and the previous snapshot stays in place, so the cache goes stale rather
//! than empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument, warn};

use crate::error::RefreshError;
use crate::metrics::MetricsBridge;
use crate::node::NodeSelector;
use crate::snapshot::{MembershipSet, Snapshot, SnapshotStore};

/// Periodic refresher for one registry.
#[derive(Clone)]
pub struct RefreshPoller {
    store: Arc<SnapshotStore>,
    selector: Arc<dyn NodeSelector>,
    metrics: MetricsBridge,
    statement: Arc<str>,
    interval: Duration,
    query_timeout: Option<Duration>,
}

impl RefreshPoller {
    pub(crate) fn new(
        store: Arc<SnapshotStore>,
        selector: Arc<dyn NodeSelector>,
        metrics: MetricsBridge,
        statement: Arc<str>,
        interval: Duration,
        query_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            selector,
            metrics,
            statement,
            interval,
            query_timeout,
        }
    }

    /// Tick period.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// The first attempt happens one interval after the call. Shutdown is
    /// checked between attempts only; a query already in flight finishes first.
    #[instrument(skip_all, name = "banned_users_poller", fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            return;
        }

        info!("Banned users poller started");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                result = shutdown.changed() => {
                    match result {
                        Ok(()) if *shutdown.borrow_and_update() => break,
                        Ok(()) => continue,
                        Err(_) => {
                            debug!("Shutdown channel closed");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.refresh_once().await {
                warn!(error = %e, "Failed to update banned user list");
            }
        }

        info!("Banned users poller stopped");
    }

    /// Perform one refresh attempt and return the new set size.
    ///
    /// # Errors
    ///
    /// Returns an error if no node is alive, the query fails, or it times out.
    /// The current snapshot is left untouched in every error case.
    pub async fn refresh_once(&self) -> Result<usize, RefreshError> {
        let node = self
            .selector
            .standby_preferred()
            .ok_or(RefreshError::NoHealthyNode)?;

        let fetch = node.fetch_column(&self.statement);
        let logins = match self.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetch)
                .await
                .map_err(|_| RefreshError::timeout(node.name(), timeout))??,
            None => fetch.await?,
        };

        let rows = logins.len();
        let members: MembershipSet = logins.into_iter().collect();
        let count = members.len();
        debug!(node = node.name(), rows, count, "Loaded banned users");

        self.store.swap(Snapshot::new(members));
        self.metrics.record_count(count);
        Ok(count)
    }
}

impl std::fmt::Debug for RefreshPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshPoller")
            .field("statement", &self.statement)
            .field("interval", &self.interval)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}
