//! Octant ordering and corner index tables.
//!
//! The octree, topology, boundary, and corner layers all share one
//! child-ordering rule; this module is its single source of truth.
//!
//! ```text
//!         y                          y
//!         ^                          ^
//!    1    |    0                5    |    4
//!         |                          |
//!  -------+-------> x   (top, +z)  --+-------> x   (bottom, -z)
//!         |                          |
//!    2    |    3                6    |    7
//! ```
//!
//! The same indices double as node corner indices: corner `i` of a
//! node lies at `center + halfwidth * octant_offset(i)`.

use crate::CubeFace;
use nalgebra::{Point3, Vector3};

/// Number of children per octree node; node corners share the same
/// count and indexing.
pub const CHILDREN_PER_NODE: usize = 8;

/// Number of corners on a single node face.
pub const NUM_CORNERS_PER_FACE: usize = 4;

/// Unit offset of octant `i` relative to its parent's center.
///
/// Each component is `+1.0` or `-1.0`; scale by the child halfwidth to
/// get the child center, or by the node halfwidth to get corner `i`.
///
/// # Panics
///
/// Panics if `i >= 8`.
#[inline]
#[must_use]
pub fn octant_offset(i: usize) -> Vector3<f64> {
    const TABLE: [[f64; 3]; 8] = [
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
    ];
    Vector3::from(TABLE[i])
}

/// Returns the octant index whose offset has the given per-axis signs.
///
/// `true` means the positive side of the axis.
#[inline]
#[must_use]
pub const fn octant_index(x_pos: bool, y_pos: bool, z_pos: bool) -> usize {
    let quadrant = match (x_pos, y_pos) {
        (true, true) => 0,
        (false, true) => 1,
        (false, false) => 2,
        (true, false) => 3,
    };
    if z_pos {
        quadrant
    } else {
        quadrant + 4
    }
}

/// World position of corner `i` of a node.
#[inline]
#[must_use]
pub fn corner_position(center: &Point3<f64>, halfwidth: f64, i: usize) -> Point3<f64> {
    center + halfwidth * octant_offset(i)
}

/// Corner-to-corner edges of the node cube.
///
/// Row `i` lists the three corner indices sharing an edge with corner
/// `i`, ordered counter-clockwise when viewed from outside the cube.
pub const CUBE_EDGES: [[usize; 3]; 8] = [
    [1, 4, 3],
    [0, 5, 2],
    [1, 6, 3],
    [0, 2, 7],
    [0, 7, 5],
    [1, 4, 6],
    [2, 5, 7],
    [3, 6, 4],
];

/// The four node-corner indices of a face, counter-clockwise as seen
/// from outside the node.
#[inline]
#[must_use]
pub const fn face_corners(face: CubeFace) -> [usize; 4] {
    match face {
        CubeFace::ZMinus => [7, 6, 5, 4],
        CubeFace::YMinus => [3, 2, 6, 7],
        CubeFace::XMinus => [2, 1, 5, 6],
        CubeFace::XPlus => [0, 3, 7, 4],
        CubeFace::YPlus => [1, 0, 4, 5],
        CubeFace::ZPlus => [0, 1, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octant_offsets_are_distinct_unit_cube_corners() {
        for i in 0..CHILDREN_PER_NODE {
            let a = octant_offset(i);
            assert!((a.x.abs() - 1.0).abs() < f64::EPSILON);
            assert!((a.y.abs() - 1.0).abs() < f64::EPSILON);
            assert!((a.z.abs() - 1.0).abs() < f64::EPSILON);
            for j in (i + 1)..CHILDREN_PER_NODE {
                assert_ne!(a, octant_offset(j));
            }
        }
    }

    #[test]
    fn octant_index_inverts_offset() {
        for i in 0..CHILDREN_PER_NODE {
            let off = octant_offset(i);
            let idx = octant_index(off.x > 0.0, off.y > 0.0, off.z > 0.0);
            assert_eq!(idx, i);
        }
    }

    #[test]
    fn face_corners_lie_on_the_face() {
        for f in CubeFace::ALL {
            for ci in face_corners(f) {
                let off = octant_offset(ci);
                assert!(
                    (off[f.axis()] - f.sign()).abs() < f64::EPSILON,
                    "corner {ci} not on face {f:?}"
                );
            }
        }
    }

    #[test]
    fn face_corners_are_cyclically_adjacent() {
        // Consecutive face corners must share a cube edge.
        for f in CubeFace::ALL {
            let cs = face_corners(f);
            for i in 0..4 {
                let a = cs[i];
                let b = cs[(i + 1) % 4];
                assert!(
                    CUBE_EDGES[a].contains(&b),
                    "corners {a} and {b} of {f:?} not edge-adjacent"
                );
            }
        }
    }

    #[test]
    fn cube_edges_are_symmetric() {
        for (i, row) in CUBE_EDGES.iter().enumerate() {
            for &j in row {
                assert!(CUBE_EDGES[j].contains(&i));
            }
        }
    }

    #[test]
    fn corner_positions_scale_with_halfwidth() {
        let c = Point3::new(1.0, 2.0, 3.0);
        let p = corner_position(&c, 0.5, 6);
        assert_eq!(p, Point3::new(0.5, 1.5, 2.5));
    }
}
