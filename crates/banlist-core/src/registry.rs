//! Banned users registry.
//!
//! Owns the snapshot store and metrics bridge for one cache instance and
//! hands out the poller that keeps it fresh. There is no global state: each
//! registry is built with its own node selector and runs its own poller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::RegistryError;
use crate::metrics::{DEFAULT_PREFIX, MetricsBridge};
use crate::node::NodeSelector;
use crate::poller::RefreshPoller;
use crate::snapshot::{Snapshot, SnapshotStore};

/// Default statement fetching the full membership list.
pub const DEFAULT_STATEMENT: &str = "SELECT login FROM banned_users";

/// Default refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Options
// =============================================================================

/// Tunables for the refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Time between refresh attempts
    pub interval: Duration,
    /// Statement returning one text column with every member
    pub statement: String,
    /// Upper bound for a single fetch (`None` leaves it to the driver)
    pub query_timeout: Option<Duration>,
    /// Metric name prefix
    pub metrics_prefix: String,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            statement: DEFAULT_STATEMENT.to_string(),
            query_timeout: None,
            metrics_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl RefreshOptions {
    fn validate(&self) -> Result<(), RegistryError> {
        if self.interval.is_zero() {
            return Err(RegistryError::ZeroInterval);
        }
        if self.statement.trim().is_empty() {
            return Err(RegistryError::invalid_option("statement must not be empty"));
        }
        if self.metrics_prefix.trim().is_empty() {
            return Err(RegistryError::invalid_option(
                "metrics prefix must not be empty",
            ));
        }
        if self.query_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RegistryError::invalid_option(
                "query timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`BannedUsersRegistry`].
#[derive(Default)]
pub struct BannedUsersRegistryBuilder {
    selector: Option<Arc<dyn NodeSelector>>,
    options: RefreshOptions,
}

impl BannedUsersRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster handle used to pick a node for each refresh.
    pub fn node_selector(mut self, selector: Arc<dyn NodeSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn options(mut self, options: RefreshOptions) -> Self {
        self.options = options;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.options.statement = statement.into();
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.options.query_timeout = Some(timeout);
        self
    }

    pub fn metrics_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.metrics_prefix = prefix.into();
        self
    }

    /// Build the registry with an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if no node selector was set or an option is invalid.
    pub fn build(self) -> Result<BannedUsersRegistry, RegistryError> {
        let selector = self.selector.ok_or(RegistryError::MissingNodeSelector)?;
        self.options.validate()?;

        let store = Arc::new(SnapshotStore::new());
        let metrics = MetricsBridge::new(&self.options.metrics_prefix, Arc::clone(&store));

        tracing::debug!(
            interval_ms = self.options.interval.as_millis() as u64,
            prefix = %self.options.metrics_prefix,
            "Banned users registry created"
        );

        Ok(BannedUsersRegistry {
            store,
            selector,
            metrics,
            options: self.options,
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Concurrently readable cache of banned logins.
///
/// Lookups are lock-free and answer from the last successfully fetched
/// snapshot. Before the first refresh every lookup returns `false`.
pub struct BannedUsersRegistry {
    store: Arc<SnapshotStore>,
    selector: Arc<dyn NodeSelector>,
    metrics: MetricsBridge,
    options: RefreshOptions,
}

impl BannedUsersRegistry {
    #[must_use]
    pub fn builder() -> BannedUsersRegistryBuilder {
        BannedUsersRegistryBuilder::new()
    }

    /// Returns `true` if `login` is in the current snapshot.
    #[must_use]
    pub fn is_banned(&self, login: &str) -> bool {
        self.store.is_member(login)
    }

    /// Time since the last successful refresh (or construction).
    #[must_use]
    pub fn cache_age(&self) -> Duration {
        self.store.age()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns `true` once at least one refresh has succeeded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.store.load().is_loaded()
    }

    /// Current snapshot, for callers that need several consistent reads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.load()
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsBridge {
        &self.metrics
    }

    /// Create the poller for this registry.
    #[must_use]
    pub fn poller(&self) -> RefreshPoller {
        RefreshPoller::new(
            Arc::clone(&self.store),
            Arc::clone(&self.selector),
            self.metrics.clone(),
            Arc::from(self.options.statement.as_str()),
            self.options.interval,
            self.options.query_timeout,
        )
    }

    /// Spawn the poller on the current tokio runtime.
    ///
    /// The task ends when `shutdown` becomes `true`.
    pub fn spawn_poller(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let poller = self.poller();
        tokio::spawn(async move { poller.run(shutdown).await })
    }
}

impl std::fmt::Debug for BannedUsersRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannedUsersRegistry")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeNode, FakeSelector};

    fn registry(node: Arc<FakeNode>) -> BannedUsersRegistry {
        BannedUsersRegistry::builder()
            .node_selector(FakeSelector::with_node(node))
            .refresh_interval(Duration::from_secs(1))
            .build()
            .expect("build registry")
    }

    #[test]
    fn test_missing_selector_is_fatal() {
        let err = BannedUsersRegistry::builder().build().unwrap_err();
        assert!(matches!(err, RegistryError::MissingNodeSelector));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let node = FakeNode::with_rows("db-1", &[]);

        let err = BannedUsersRegistry::builder()
            .node_selector(FakeSelector::with_node(node.clone()))
            .refresh_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::ZeroInterval));

        let err = BannedUsersRegistry::builder()
            .node_selector(FakeSelector::with_node(node.clone()))
            .statement("   ")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption(_)));

        let err = BannedUsersRegistry::builder()
            .node_selector(FakeSelector::with_node(node))
            .metrics_prefix("")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption(_)));
    }

    #[test]
    fn test_defaults() {
        let options = RefreshOptions::default();
        assert_eq!(options.interval, Duration::from_secs(1));
        assert_eq!(options.statement, "SELECT login FROM banned_users");
        assert_eq!(options.metrics_prefix, "banned_user");
        assert!(options.query_timeout.is_none());
    }

    #[tokio::test]
    async fn test_fresh_registry_bans_nobody() {
        let registry = registry(FakeNode::with_rows("db-1", &["alice"]));
        assert!(!registry.is_loaded());
        assert!(registry.is_empty());
        assert!(!registry.is_banned("alice"));
        assert!(!registry.is_banned(""));
    }

    #[tokio::test]
    async fn test_refresh_through_registry_poller() {
        let node = FakeNode::with_rows("db-1", &["alice", "bob"]);
        let registry = registry(node.clone());

        registry.poller().refresh_once().await.unwrap();
        assert!(registry.is_loaded());
        assert!(registry.is_banned("alice"));
        assert!(registry.is_banned("bob"));
        assert!(!registry.is_banned("carol"));
        assert!(registry.cache_age() < Duration::from_secs(1));

        node.set_rows(&["carol"]);
        registry.poller().refresh_once().await.unwrap();
        assert!(!registry.is_banned("alice"));
        assert!(registry.is_banned("carol"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_only_refresh_changes_answers() {
        let node = FakeNode::with_rows("db-1", &["alice"]);
        let registry = registry(node.clone());
        registry.poller().refresh_once().await.unwrap();
        let held = registry.snapshot();

        // Source changes are invisible until the next refresh
        node.set_rows(&[]);
        assert!(registry.is_banned("alice"));
        assert_eq!(registry.snapshot().generation(), held.generation());

        registry.poller().refresh_once().await.unwrap();
        assert!(!registry.is_banned("alice"));
        assert!(registry.is_loaded());
        assert!(held.contains("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poller_stops_and_keeps_data() {
        let node = FakeNode::with_rows("db-1", &["alice"]);
        let registry = registry(node);
        let (tx, rx) = watch::channel(false);

        let handle = registry.spawn_poller(rx);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(registry.is_banned("alice"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(registry.is_banned("alice"));
        assert!(registry.cache_age() >= Duration::from_secs(30));
    }
}
