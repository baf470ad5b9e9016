//! Shared foundation types for the voxcarve reconstruction pipeline.
//!
//! This crate provides the vocabulary used by every stage of the
//! pipeline, from probabilistic carving through surface extraction:
//!
//! - [`CubeFace`] - The six axis-aligned faces of an octree node
//! - Octant tables ([`octant_offset`], [`face_corners`], [`CUBE_EDGES`])
//! - [`Aabb`] - Axis-aligned bounding boxes for shape insertion
//! - [`CancelToken`] - Cooperative cancellation with optional deadline
//! - [`ReconstructConfig`] - The pipeline options record
//! - [`CarveError`] - The shared error enum for all pipeline stages
//!
//! # Layer 0 Crate
//!
//! This is a layer 0 crate with no engine or I/O dependencies. It can
//! be used from CLI tools, services, and test harnesses alike.
//!
//! # Coordinate Systems
//!
//! All world coordinates are continuous `f64` meters in a right-handed
//! system. Octree octants and node corners share one ordering rule,
//! defined by [`octant_offset`]: index 0 is the `+x+y+z` octant,
//! indices 1..4 walk counter-clockwise around `+z`, and indices 4..8
//! repeat the pattern for `-z`.
//!
//! # Example
//!
//! ```
//! use carve_types::{CubeFace, octant_offset};
//!
//! // Octant 0 sits on the positive side of every axis.
//! let off = octant_offset(0);
//! assert_eq!((off.x, off.y, off.z), (1.0, 1.0, 1.0));
//!
//! // Opposing faces pair up.
//! assert_eq!(CubeFace::XPlus.opposite(), CubeFace::XMinus);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod aabb;
mod cancel;
mod config;
mod error;
mod face;
mod octant;

pub use aabb::Aabb;
pub use cancel::CancelToken;
pub use config::ReconstructConfig;
pub use error::{CarveError, Result};
pub use face::CubeFace;
pub use octant::{
    corner_position, face_corners, octant_index, octant_offset, CHILDREN_PER_NODE, CUBE_EDGES,
    NUM_CORNERS_PER_FACE,
};

// Re-export the nalgebra types used throughout the pipeline.
pub use nalgebra::{Point3, Vector3};
