//! Arena nodes and handles.

use crate::LeafData;
use carve_types::{octant_index, CHILDREN_PER_NODE};
use nalgebra::Point3;

/// Stable handle to a node in the octree arena.
///
/// Handles are plain indices; nodes are never removed from the arena,
/// so a handle stays valid for the lifetime of the tree it came from.
/// Derived structures (topology, boundary, corners, regions) hold
/// `NodeId`s rather than references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the arena index of this handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One octree node: a cube with up to eight children and an optional
/// probabilistic payload.
///
/// Only leaves carry payloads; refining a leaf redistributes its
/// payload over the new children.
#[derive(Debug, Clone)]
pub struct Node {
    /// Center of the node cube.
    pub center: Point3<f64>,
    /// Distance from the center to each face.
    pub halfwidth: f64,
    /// Child handles in octant order; `None` where no child exists.
    pub children: [Option<NodeId>; CHILDREN_PER_NODE],
    /// Probabilistic payload; only present on leaves.
    pub data: Option<LeafData>,
}

impl Node {
    /// Creates a childless node with no payload.
    #[must_use]
    pub const fn new(center: Point3<f64>, halfwidth: f64) -> Self {
        Self {
            center,
            halfwidth,
            children: [None; CHILDREN_PER_NODE],
            data: None,
        }
    }

    /// Returns `true` when the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Tests whether a point lies within this node's cube and, if so,
    /// returns the octant index of the child that would contain it.
    ///
    /// Points on an internal boundary resolve toward the positive
    /// octant, matching the descent rule used everywhere else.
    #[must_use]
    pub fn octant_of(&self, p: &Point3<f64>) -> Option<usize> {
        let d = p - self.center;
        if d.x.abs() > self.halfwidth || d.y.abs() > self.halfwidth || d.z.abs() > self.halfwidth {
            return None;
        }
        Some(octant_index(d.x >= 0.0, d.y >= 0.0, d.z >= 0.0))
    }

    /// Total surface area of the node cube.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        let w = 2.0 * self.halfwidth;
        6.0 * w * w
    }
}
