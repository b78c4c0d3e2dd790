//! Background-refreshed membership cache for Banlist.
//!
//! This crate provides:
//!
//! - [`SnapshotStore`]: the current immutable membership set, swapped atomically
//! - [`RefreshPoller`]: the single background task that keeps the store fresh
//! - [`MetricsBridge`]: set size and cache age gauges, computed at scrape time
//! - [`BannedUsersRegistry`]: the instance that ties them together
//! - [`ModuloSampler`]: lock-free "every Nth call" decimation
//!
//! The data source is reached through the [`NodeSelector`] and [`DataNode`]
//! traits, so the cache itself never depends on a database driver.
//!
//! # Example
//!
//! ```ignore
//! use banlist_core::BannedUsersRegistry;
//!
//! let registry = BannedUsersRegistry::builder()
//!     .node_selector(cluster)
//!     .build()?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let poller = registry.spawn_poller(shutdown_rx);
//!
//! if registry.is_banned("alice") {
//!     // reject
//! }
//!
//! let _ = shutdown_tx.send(true);
//! poller.await?;
//! ```

pub mod error;
pub mod metrics;
pub mod node;
pub mod poller;
pub mod registry;
pub mod sampler;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod fakes;

pub use crate::error::{RefreshError, RegistryError};
pub use crate::metrics::MetricsBridge;
pub use crate::node::{DataNode, NodeSelector};
pub use crate::poller::RefreshPoller;
pub use crate::registry::{BannedUsersRegistry, BannedUsersRegistryBuilder, RefreshOptions};
pub use crate::sampler::ModuloSampler;
pub use crate::snapshot::{MembershipSet, Snapshot, SnapshotStore};
