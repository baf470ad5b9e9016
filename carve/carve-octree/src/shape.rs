//! The shape insertion seam.

use crate::LeafData;
use carve_types::Aabb;
use nalgebra::Point3;

/// How a shape relates to an axis-aligned node cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxRelation {
    /// The shape does not touch the cube; prune the subtree.
    Disjoint,
    /// The cube lies entirely inside the shape; apply without
    /// refinement.
    Inside,
    /// The shape crosses the cube boundary; refine while depth allows.
    Straddles,
}

/// Capability set a shape must provide to be carved into the tree.
///
/// The insertion walk ([`crate::Octree::insert_shape`]) needs exactly
/// three things from a shape: a conservative bound for domain growth
/// and pruning, a node-box classification, and a leaf application that
/// merges the shape's contribution into the leaf payload.
///
/// The concrete shape set is closed (see the `carve-engine` crate);
/// this trait is the seam between the store and the shape kinds.
pub trait CarveShape {
    /// A conservative world-space bound of the shape. Must be
    /// non-degenerate for the shape to be insertable.
    fn aabb(&self) -> Aabb;

    /// Classifies the relation between the shape and a node cube.
    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation;

    /// Merges this shape's contribution into a leaf payload.
    fn apply_to_leaf(&self, data: &mut LeafData, center: &Point3<f64>, halfwidth: f64);
}
