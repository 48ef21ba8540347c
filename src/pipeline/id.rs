//! Identity types for the pipeline system.
//!
//! `NodeId` and `EdgeId` are newtypes over `u32` that index directly into
//! the builder's node and edge vectors. `ItemId` is the source's generation
//! number for a matrix and travels with every message derived from it.

use serde::Serialize;
use std::fmt;

/// Index into the pipeline's stage list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into the pipeline's edge list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// Generation number of a matrix, assigned by the source starting at 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ItemId(pub u64);

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Anything that belongs to exactly one matrix.
///
/// The synchronizers use this to check that the results they pair up by
/// arrival order really describe the same matrix.
pub trait Tagged {
    fn item(&self) -> ItemId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "NodeId(42)");
    }

    #[test]
    fn test_item_id_ordering_and_display() {
        assert!(ItemId(3) < ItemId(4));
        assert_eq!(ItemId(7).to_string(), "#7");
    }

    #[test]
    fn test_edge_id() {
        assert_eq!(EdgeId(5).index(), 5);
    }
}
