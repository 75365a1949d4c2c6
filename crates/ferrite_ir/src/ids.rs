//! Opaque ID newtype for register-map tree nodes.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

/// Opaque, copyable ID of a node in the register-map tree.
///
/// A `NodeId` is a thin `u32` wrapper created by
/// [`Arena::alloc`](crate::arena::Arena::alloc) and resolved through the
/// owning [`RegMap`](crate::regmap::RegMap). IDs are stable for the lifetime
/// of the map, so property references (reset signals, write-enable sources)
/// are stored as `NodeId`s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for NodeId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}
