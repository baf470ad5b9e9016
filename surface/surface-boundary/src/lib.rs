//! Boundary faces and corner maps for the voxcarve surface pipeline.
//!
//! Once carving has labeled the octree's leaves, the surface lives on
//! the faces between interior and non-interior volume. This crate
//! extracts that boundary and the corner structure the mesher needs:
//!
//! - [`SegScheme`] - the pure interior predicate selecting which
//!   segmentation of the model is being extracted
//! - [`BoundaryFace`] / [`FaceId`] - oriented interior/exterior face
//!   tuples with grid geometry
//! - [`Boundary`] - the face set plus face-to-face adjacency links
//! - [`Corner`] / [`CornerMap`] - canonical lattice corners mapped to
//!   their incident boundary faces and corner-to-corner edges
//!
//! # Example
//!
//! ```
//! use carve_octree::{LeafData, Octree};
//! use surface_boundary::{Boundary, SegScheme};
//! use surface_topology::Topology;
//! use nalgebra::Point3;
//!
//! // One solid voxel in a 4x4x4 grid: its boundary is a cube.
//! let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
//! let leaf = tree.insert_point(&Point3::new(0.5, 0.5, 0.5)).unwrap();
//! tree.set_leaf_data(leaf, LeafData::from_sample(1.0, 0.9, 0.5, 0.0, 0.5)).unwrap();
//!
//! let topo = Topology::build(&tree);
//! let boundary = Boundary::extract(&tree, &topo, SegScheme::All);
//! assert_eq!(boundary.len(), 6);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod boundary;
mod corner;
mod face;
mod scheme;

pub use boundary::Boundary;
pub use corner::{Corner, CornerMap};
pub use face::{BoundaryFace, FaceId};
pub use scheme::SegScheme;
