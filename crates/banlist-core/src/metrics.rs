//! Gauges for the membership cache.
//!
//! Both gauges are derived from the [`SnapshotStore`] when [`MetricsBridge::sample`]
//! runs, typically right before the exporter renders a scrape. The count gauge
//! is also set by the poller after each successful refresh.

use std::sync::Arc;

use ::metrics::gauge;

use crate::snapshot::SnapshotStore;

/// Default metric prefix.
pub const DEFAULT_PREFIX: &str = "banned_user";

/// Exposes set size and snapshot age under a common prefix.
///
/// Registers `<prefix>.count` and `<prefix>.cache_age.seconds`.
#[derive(Debug, Clone)]
pub struct MetricsBridge {
    store: Arc<SnapshotStore>,
    count_name: String,
    age_name: String,
}

impl MetricsBridge {
    #[must_use]
    pub fn new(prefix: &str, store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            count_name: format!("{prefix}.count"),
            age_name: format!("{prefix}.cache_age.seconds"),
        }
    }

    #[must_use]
    pub fn count_name(&self) -> &str {
        &self.count_name
    }

    #[must_use]
    pub fn age_name(&self) -> &str {
        &self.age_name
    }

    /// Seconds since the last successful swap.
    #[must_use]
    pub fn cache_age_seconds(&self) -> f64 {
        self.store.age().as_secs_f64()
    }

    /// Set the count gauge.
    pub fn record_count(&self, count: usize) {
        gauge!(self.count_name.clone()).set(count as f64);
    }

    /// Recompute both gauges from the current snapshot.
    pub fn sample(&self) {
        let snapshot = self.store.load();
        gauge!(self.count_name.clone()).set(snapshot.len() as f64);
        gauge!(self.age_name.clone()).set(snapshot.age().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MembershipSet, Snapshot};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::Duration;

    #[test]
    fn test_metric_names_use_prefix() {
        let bridge = MetricsBridge::new("banned_user", Arc::new(SnapshotStore::new()));
        assert_eq!(bridge.count_name(), "banned_user.count");
        assert_eq!(bridge.age_name(), "banned_user.cache_age.seconds");
    }

    #[test]
    fn test_sample_renders_count_and_age() {
        let store = Arc::new(SnapshotStore::new());
        let members: MembershipSet = ["alice", "bob"].into_iter().collect();
        store.swap(Snapshot::new(members));
        let bridge = MetricsBridge::new("banned_user", Arc::clone(&store));

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, || bridge.sample());

        let rendered = handle.render();
        assert!(rendered.contains("banned_user_count 2"), "{rendered}");
        assert!(rendered.contains("banned_user_cache_age_seconds"), "{rendered}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_age_grows_without_swaps() {
        let store = Arc::new(SnapshotStore::new());
        let bridge = MetricsBridge::new(DEFAULT_PREFIX, Arc::clone(&store));

        tokio::time::advance(Duration::from_secs(12)).await;
        assert_eq!(bridge.cache_age_seconds(), 12.0);
    }
}
