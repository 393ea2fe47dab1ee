//=========================================================================
// Node Snapshot
//=========================================================================
//
// Ordered set of live node handles captured by one traversal, and the
// entered / remained / exited partition between two of them.
//
// Order is traversal order and only matters for determinism. Membership
// uses a hash index, so the diff is O(n + m).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashSet;
use std::hash::Hash;

//=== NodeSnapshot ========================================================

/// Live node handles in traversal order.
#[derive(Debug, Clone)]
pub struct NodeSnapshot<N> {
    order: Vec<N>,
    index: HashSet<N>,
}

impl<N: Copy + Eq + Hash> NodeSnapshot<N> {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Creates an empty snapshot sized for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
        }
    }

    /// Appends a node. Returns false (and keeps the first position) if the
    /// node is already present.
    pub fn push(&mut self, node: N) -> bool {
        if !self.index.insert(node) {
            return false;
        }
        self.order.push(node);
        true
    }

    /// Whether the node is in the snapshot.
    pub fn contains(&self, node: N) -> bool {
        self.index.contains(&node)
    }

    /// Nodes in traversal order.
    pub fn as_slice(&self) -> &[N] {
        &self.order
    }

    /// Iterates nodes in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = N> + '_ {
        self.order.iter().copied()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the snapshot holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

impl<N: Copy + Eq + Hash> Default for NodeSnapshot<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> FromIterator<N> for NodeSnapshot<N> {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for node in iter {
            snapshot.push(node);
        }
        snapshot
    }
}

impl<N: Copy + Eq + Hash> PartialEq for NodeSnapshot<N> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<N: Copy + Eq + Hash> Eq for NodeSnapshot<N> {}

//=== SnapshotDiff ========================================================

/// Partition of two consecutive snapshots.
///
/// `entered` and `remained` follow the current snapshot's order, `exited`
/// follows the previous snapshot's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDiff<N> {
    /// In current, not in previous.
    pub entered: Vec<N>,
    /// In both.
    pub remained: Vec<N>,
    /// In previous, not in current.
    pub exited: Vec<N>,
}

impl<N> SnapshotDiff<N> {
    /// Returns true if nothing entered or exited.
    pub fn is_unchanged(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

//=== diff() ==============================================================

/// Partitions `previous` and `current` by node identity.
pub fn diff<N: Copy + Eq + Hash>(previous: &NodeSnapshot<N>, current: &NodeSnapshot<N>) -> SnapshotDiff<N> {
    let (remained, entered) = current.iter().partition(|&node| previous.contains(node));
    let exited = previous.iter().filter(|&node| !current.contains(node)).collect();

    SnapshotDiff {
        entered,
        remained,
        exited,
    }
}

//=== Tests ===============================================================
