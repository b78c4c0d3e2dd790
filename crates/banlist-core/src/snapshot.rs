//! Immutable membership snapshots and the store that publishes them.
//!
//! Readers load the current [`Snapshot`] with a single atomic pointer load and
//! never wait on the writer. The poller builds a complete new snapshot off to
//! the side and publishes it with [`SnapshotStore::swap`], so a reader sees
//! either the old set or the new one in full.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use time::OffsetDateTime;
use tokio::time::Instant;

// =============================================================================
// Membership Set
// =============================================================================

/// Set of opaque string keys, e.g. banned logins.
///
/// Built once per refresh and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSet {
    members: HashSet<String>,
}

impl MembershipSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` is a member.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    /// Number of distinct members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over members in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}

impl FromIterator<String> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_owned).collect()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A membership set together with the moment it was fetched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    members: MembershipSet,
    /// Swaps that led to this snapshot; 0 for the initial empty one
    generation: u64,
    fetched_at: Instant,
    fetched_at_utc: OffsetDateTime,
}

impl Snapshot {
    /// Stamp `members` with the current time.
    #[must_use]
    pub fn new(members: MembershipSet) -> Self {
        Self {
            members,
            generation: 0,
            fetched_at: Instant::now(),
            fetched_at_utc: OffsetDateTime::now_utc(),
        }
    }

    /// An empty snapshot stamped now.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(MembershipSet::new())
    }

    #[must_use]
    pub fn members(&self) -> &MembershipSet {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Position in the store's publish order, 0 until first published.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if this snapshot came from a refresh rather than
    /// being the store's initial placeholder.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    /// Monotonic fetch time.
    #[must_use]
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Wall-clock fetch time, for reporting only.
    #[must_use]
    pub fn fetched_at_utc(&self) -> OffsetDateTime {
        self.fetched_at_utc
    }

    /// Time elapsed since this snapshot was fetched.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

// =============================================================================
// Snapshot Store
// =============================================================================

/// Holds the current [`Snapshot`] behind an `ArcSwap`.
///
/// Reads are a single atomic load and never block. Writes replace the whole
/// pointer; the set itself is never traversed under a lock. Only the poller
/// in this crate publishes, so outside code can read but never write:
///
/// ```compile_fail
/// use banlist_core::{Snapshot, SnapshotStore};
///
/// let store = SnapshotStore::new();
/// store.swap(Snapshot::empty());
/// ```
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    /// Create a store holding an empty snapshot stamped now.
    ///
    /// Early readers get `false` for every key instead of an error.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// Returns `true` if `key` is in the current snapshot.
    #[must_use]
    pub fn is_member(&self, key: &str) -> bool {
        self.current.load().contains(key)
    }

    /// Age of the current snapshot.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.current.load().age()
    }

    /// Size of the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Get the current snapshot.
    ///
    /// The returned `Arc` stays valid after later swaps, so a caller that
    /// needs several consistent reads should load once and query the snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Publish `snapshot` as current in one atomic step.
    ///
    /// Assumes a single writer: the generation is read and bumped without a
    /// compare-and-swap.
    pub(crate) fn swap(&self, mut snapshot: Snapshot) {
        snapshot.generation = self.current.load().generation + 1;
        self.current.store(Arc::new(snapshot));
    }

    /// Number of swaps since construction.
    ///
    /// Zero means the store still holds its initial empty snapshot.
    #[must_use]
    pub fn swap_count(&self) -> u64 {
        self.current.load().generation
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("SnapshotStore")
            .field("len", &current.len())
            .field("age", &current.age())
            .field("swaps", &self.swap_count())
            .finish()
    }
}
