//! PostgreSQL cluster support for Banlist.
//!
//! Provides a [`PgCluster`] that tracks the role of every configured node
//! (primary, standby, or dead) with a background health checker, and picks
//! the best node for read traffic:
//!
//! - the alive standby with the lowest check latency, else
//! - the primary, else
//! - nothing, which the refresh poller treats as a retriable failure.
//!
//! `PgCluster` implements [`banlist_core::NodeSelector`], and each
//! [`PgNode`] implements [`banlist_core::DataNode`].
//!
//! # Example
//!
//! ```ignore
//! use banlist_postgres::{ClusterConfig, PgCluster};
//!
//! let cluster = Arc::new(PgCluster::connect(&ClusterConfig::new(vec![
//!     "postgres://app@db-1:6432/banlist".into(),
//!     "postgres://app@db-2:6432/banlist".into(),
//! ]))?);
//! cluster.check_once().await;
//! let checker = cluster.spawn_checker(shutdown_rx.clone());
//! ```

pub mod cluster;
pub mod node;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use cluster::{ClusterConfig, ClusterTopology, PgCluster};
pub use node::{NodeRole, NodeStatus, PgNode};

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while building a cluster.
///
/// These are configuration errors. Unreachable hosts are not errors at
/// construction time: pools connect lazily and dead nodes show up in the
/// topology instead.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// No node URLs were configured.
    #[error("no postgres cluster nodes configured")]
    NoNodes,

    /// A node URL could not be parsed.
    #[error("invalid url for node #{index}: {message}")]
    InvalidUrl { index: usize, message: String },

    /// The pool could not be created for a node.
    #[error("failed to create pool for {node}: {source}")]
    Pool {
        node: String,
        #[source]
        source: sqlx_core::Error,
    },

    /// Invalid cluster option.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl ClusterError {
    #[must_use]
    pub fn invalid_url(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            index,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }
}

/// Result type for cluster construction.
pub type ClusterResult<T> = Result<T, ClusterError>;
