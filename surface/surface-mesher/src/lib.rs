//! Region-aware watertight meshing for the voxcarve pipeline.
//!
//! The final stage of the pipeline: given a carved octree and its
//! coalesced planar regions, emit a consistent triangle mesh whose
//! vertices are the multi-region corners of the boundary, snapped onto
//! the intersections of the fitted region planes.
//!
//! - [`TriangleMesh`] - the output vertex/face lists
//! - [`snap_vertex`] - SVD snapping with kernel fallback
//! - [`build_mesh`] - discovery, snapping, and per-region quadtree
//!   triangulation
//! - [`reconstruct`] - the whole surface pipeline in one call
//! - [`MeshAdjacency`] - edge incidence backing the watertightness
//!   contract
//!
//! # Watertightness
//!
//! Every corner shared by two or more regions becomes exactly one
//! mesh vertex, and every region triangulation enumerates exactly the
//! shared vertices along its rim, so each internal edge is used twice
//! with opposite orientation and region seams close by construction.
//! [`MeshAdjacency::is_closed_manifold`] verifies the contract.
//!
//! # Example
//!
//! ```
//! use carve_octree::{LeafData, Octree};
//! use carve_types::{CancelToken, CubeFace, ReconstructConfig};
//! use surface_boundary::SegScheme;
//! use surface_mesher::{is_watertight_manifold, reconstruct};
//! use nalgebra::Point3;
//!
//! // One solid voxel with observed empty space around it.
//! let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
//! let p = Point3::new(0.5, 0.5, 0.5);
//! let id = tree.insert_point(&p).unwrap();
//! tree.set_leaf_data(id, LeafData::from_sample(1.0, 1.0, 1.0, 0.0, 1.0)).unwrap();
//! for face in CubeFace::ALL {
//!     let id = tree.insert_point(&(p + face.normal())).unwrap();
//!     tree.set_leaf_data(id, LeafData::from_sample(1.0, 0.0, 1.0, 0.0, 1.0)).unwrap();
//! }
//!
//! let mesh = reconstruct(
//!     &tree,
//!     SegScheme::All,
//!     &ReconstructConfig::default(),
//!     &CancelToken::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(mesh.vertex_count(), 8);
//! assert_eq!(mesh.face_count(), 12);
//! assert!(is_watertight_manifold(&mesh));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod adjacency;
mod lattice;
mod mesh;
mod mesher;
mod snap;

pub use adjacency::MeshAdjacency;
pub use mesh::TriangleMesh;
pub use mesher::{build_mesh, is_watertight_manifold, reconstruct};
pub use snap::snap_vertex;
