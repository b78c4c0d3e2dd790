//! Error types for the membership cache.

use std::time::Duration;

// =============================================================================
// Registry Errors
// =============================================================================

/// Configuration errors raised while building a [`BannedUsersRegistry`].
///
/// These are fatal: a registry that fails to build is never usable.
///
/// [`BannedUsersRegistry`]: crate::BannedUsersRegistry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No node selector (cluster handle) was supplied.
    #[error("no postgres cluster defined")]
    MissingNodeSelector,

    /// Refresh interval must be non-zero.
    #[error("refresh interval must be greater than zero")]
    ZeroInterval,

    /// Invalid option value.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl RegistryError {
    /// Create an `InvalidOption` error.
    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }
}

// =============================================================================
// Refresh Errors
// =============================================================================

/// Errors from a single refresh attempt.
///
/// All variants are transient. The poller logs them and keeps the previous
/// snapshot; they never reach readers.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The cluster has no alive node to query.
    #[error("no alive postgres node found")]
    NoHealthyNode,

    /// The query failed on the selected node.
    #[error("query on node {node} failed: {source}")]
    Query {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The query did not finish in time.
    #[error("query on node {node} timed out after {timeout:?}")]
    Timeout { node: String, timeout: Duration },
}

impl RefreshError {
    /// Create a `Query` error for the given node.
    #[must_use]
    pub fn query(
        node: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Query {
            node: node.into(),
            source: source.into(),
        }
    }

    /// Create a `Timeout` error for the given node.
    #[must_use]
    pub fn timeout(node: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            node: node.into(),
            timeout,
        }
    }

    /// Returns `true` if no node was available.
    #[must_use]
    pub fn is_no_healthy_node(&self) -> bool {
        matches!(self, Self::NoHealthyNode)
    }

    /// Returns `true` if the query itself failed.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Returns `true` if the query timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Name of the node involved, if any.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NoHealthyNode => None,
            Self::Query { node, .. } | Self::Timeout { node, .. } => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_healthy_node() {
        let err = RefreshError::NoHealthyNode;
        assert!(err.is_no_healthy_node());
        assert!(err.node().is_none());
        assert_eq!(err.to_string(), "no alive postgres node found");
    }

    #[test]
    fn test_query_error_keeps_source() {
        let err = RefreshError::query("db-1:5432", "relation \"banned_users\" does not exist");
        assert!(err.is_query_error());
        assert_eq!(err.node(), Some("db-1:5432"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("banned_users"));
    }

    #[test]
    fn test_timeout_error() {
        let err = RefreshError::timeout("db-2:5432", Duration::from_secs(2));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "query on node db-2:5432 timed out after 2s");
    }

    #[test]
    fn test_registry_error_messages() {
        assert_eq!(
            RegistryError::MissingNodeSelector.to_string(),
            "no postgres cluster defined"
        );
        assert_eq!(
            RegistryError::invalid_option("statement must not be empty").to_string(),
            "Invalid option: statement must not be empty"
        );
    }
}
