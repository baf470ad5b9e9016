//! Shape-carving engine for the voxcarve octree.
//!
//! This crate owns the closed set of carvable shapes and the driver
//! that feeds a stream of weighted scan rays into the octree:
//!
//! - [`RayCarve`] - a single weighted scan ray with its occupancy model
//! - [`CarveWedge`] - the probabilistic envelope between two
//!   consecutive-frame rays
//! - [`ExtrudedPolygon`] - a floorplan room prism that tags leaves
//! - [`SolidBox`] / [`PlaneSeed`] - geometry stamps for seeding and
//!   testing
//! - [`ShapeKind`] - the tagged union dispatched by the octree walk
//! - [`carve_stream`] / [`import_room`] - the bulk drivers with
//!   skip-and-count error policy and cooperative cancellation
//!
//! # Occupancy model
//!
//! A ray reports empty space along its length and solid space at its
//! endpoint. The occupancy sample at arc length `d` along a ray of
//! length `L` is the logistic
//!
//! ```text
//! p(d) = 1 / (1 + exp(-4 (d - (L - tau)) / tau))
//! ```
//!
//! where `tau` is the transition bandwidth (the tree resolution by
//! default): near zero along the free-space run, 0.5 one band before
//! the endpoint, and ~0.98 at the endpoint. The surface, corner, and
//! planarity priors are attenuated by the transition envelope
//! `4 p (1 - p)` so their evidence concentrates where the surface
//! actually is.
//!
//! # Example
//!
//! ```
//! use carve_engine::{carve_stream, RaySample};
//! use carve_octree::Octree;
//! use carve_types::CancelToken;
//! use nalgebra::Point3;
//!
//! let mut tree = Octree::new(1.0);
//! let rays = vec![RaySample {
//!     start: Point3::origin(),
//!     end: Point3::new(5.0, 0.0, 0.0),
//!     weight: 1.0,
//!     surface_prior: 0.5,
//!     planar_prior: 0.5,
//!     corner_prior: 0.5,
//! }];
//!
//! let summary = carve_stream(&mut tree, rays, &CancelToken::new()).unwrap();
//! assert_eq!(summary.carved, 1);
//! assert_eq!(summary.skipped, 0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod ray;
mod room;
mod shapes;
mod solid;
mod stream;
mod wedge;

pub use ray::RayCarve;
pub use room::ExtrudedPolygon;
pub use shapes::ShapeKind;
pub use solid::{PlaneSeed, SolidBox};
pub use stream::{carve_stream, import_room, CarveSummary, RaySample};
pub use wedge::CarveWedge;
