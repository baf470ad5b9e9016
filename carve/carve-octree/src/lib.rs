//! Probabilistic octree store for volumetric carving.
//!
//! The octree is the single mutable structure in the voxcarve
//! pipeline. Scan rays and floorplan prisms are inserted as shapes
//! ([`CarveShape`]); each intersected leaf accumulates a probabilistic
//! payload ([`LeafData`]) describing the occupancy distribution of its
//! voxel. Every derived structure (topology, boundary, corners,
//! regions, mesh) reads the tree through stable [`NodeId`] handles.
//!
//! - [`Octree`] - arena-backed adaptive 8-way index with domain growth
//! - [`LeafData`] - weighted occupancy statistics and room tagging
//! - [`CarveShape`] / [`BoxRelation`] - the shape insertion seam
//! - binary persistence with versioned payloads ([`Octree::serialize`],
//!   [`Octree::parse`])
//!
//! # Handles
//!
//! Nodes live in an arena `Vec` and never move or disappear, so a
//! `NodeId` taken before a *non-structural* operation stays valid.
//! Structural mutation (inserting shapes, growing the domain)
//! invalidates derived structures; rebuild them afterwards.
//!
//! # Example
//!
//! ```
//! use carve_octree::Octree;
//! use nalgebra::Point3;
//!
//! let mut tree = Octree::new(1.0);
//! tree.include_point(&Point3::new(4.0, 0.0, 0.0)).unwrap();
//!
//! // The domain has grown to cover the point.
//! assert!(tree.leaf_at(&Point3::new(4.0, 0.0, 0.0)).is_some());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod data;
mod io;
mod node;
mod shape;
mod tree;

pub use data::LeafData;
pub use node::{Node, NodeId};
pub use shape::{BoxRelation, CarveShape};
pub use tree::{Octree, MAX_TREE_DEPTH};
