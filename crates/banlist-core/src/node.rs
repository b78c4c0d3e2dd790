//! Data source contract.
//!
//! The poller never talks to a database driver directly. It asks a
//! [`NodeSelector`] for a healthy [`DataNode`] and runs its statement there.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RefreshError;

/// A single queryable endpoint of a replicated data source.
#[async_trait]
pub trait DataNode: Send + Sync {
    /// Name used in logs and errors, e.g. `db-1:5432`.
    fn name(&self) -> &str;

    /// Run a read-only `statement` returning one text column and collect
    /// every row.
    async fn fetch_column(&self, statement: &str) -> Result<Vec<String>, RefreshError>;
}

/// Supplies a healthy node, preferring standby replicas over the primary.
pub trait NodeSelector: Send + Sync {
    /// Returns `None` when no node is alive. Callers treat that as a
    /// retriable condition.
    fn standby_preferred(&self) -> Option<Arc<dyn DataNode>>;
}

impl<T: NodeSelector + ?Sized> NodeSelector for Arc<T> {
    fn standby_preferred(&self) -> Option<Arc<dyn DataNode>> {
        (**self).standby_preferred()
    }
}
