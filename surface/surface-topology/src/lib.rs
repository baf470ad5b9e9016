//! Face-adjacency topology over the voxcarve octree.
//!
//! The octree structure only links parents to children; surface
//! extraction needs to know which *leaves* touch which other leaves
//! across node faces, including across subdivision levels. This crate
//! derives that relation:
//!
//! - [`Topology::build`] - computes six face-keyed neighbor sets per
//!   leaf, walking the tree top-down and resolving cross-level
//!   adjacency
//! - [`Topology::verify`] - checks symmetry, leaf-ness, and geometric
//!   consistency of the derived relation
//! - [`Topology::remove_outliers`] - flips isolated mislabeled leaves
//!   by area-weighted neighbor vote
//!
//! A face-keyed set contains multiple handles when the neighboring
//! side is subdivided more finely, and exactly one when the neighbor
//! is the same size or coarser.
//!
//! # Example
//!
//! ```
//! use carve_octree::Octree;
//! use surface_topology::Topology;
//! use nalgebra::Point3;
//!
//! let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
//! let a = tree.insert_point(&Point3::new(-0.5, 0.5, 0.5)).unwrap();
//! let b = tree.insert_point(&Point3::new(0.5, 0.5, 0.5)).unwrap();
//!
//! let topo = Topology::build(&tree);
//! assert!(topo.are_neighbors(a, b));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod outliers;
mod topology;

pub use topology::{NeighborRecord, Topology};
