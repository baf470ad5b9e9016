//! Planar-region growth and coalescence for the voxcarve surface.
//!
//! Boundary faces along flat building surfaces should mesh as large
//! planes, not as voxel staircases. This crate groups faces into
//! planar regions and merges neighboring regions that fit one plane
//! within statistical tolerance:
//!
//! - [`face_planarity`] / [`isosurface_position`] /
//!   [`position_variance`] - per-face statistics derived from the two
//!   incident leaf distributions
//! - [`PlaneFit`] - least-squares plane fitting with a conditioning
//!   fallback
//! - [`RegionGraph`] - flood-fill region formation, neighbor tracking,
//!   and the priority-queue coalescence loop
//!
//! Every boundary face belongs to exactly one region at all times; the
//! partition only coarsens as regions merge.
//!
//! # Example
//!
//! ```
//! use carve_octree::{LeafData, Octree};
//! use carve_types::ReconstructConfig;
//! use surface_boundary::{Boundary, SegScheme};
//! use surface_regions::RegionGraph;
//! use surface_topology::Topology;
//! use nalgebra::Point3;
//!
//! let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
//! let leaf = tree.insert_point(&Point3::new(0.5, 0.5, 0.5)).unwrap();
//! tree.set_leaf_data(leaf, LeafData::from_sample(1.0, 0.9, 1.0, 0.0, 1.0)).unwrap();
//!
//! let topo = Topology::build(&tree);
//! let boundary = Boundary::extract(&tree, &topo, SegScheme::All);
//! let graph = RegionGraph::build(&tree, &boundary, &ReconstructConfig::default()).unwrap();
//!
//! // One solid voxel: six single-face regions, one per direction.
//! assert_eq!(graph.region_count(), 6);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod graph;
mod plane;
mod stats;

pub use graph::{RegionGraph, RegionInfo};
pub use plane::PlaneFit;
pub use stats::{face_planarity, isosurface_position, position_variance};
