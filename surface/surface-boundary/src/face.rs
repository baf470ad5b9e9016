//! Oriented boundary faces.

use carve_octree::{NodeId, Octree};
use carve_types::{CubeFace, Point3, Vector3};

/// Tolerance for the geometric edge-sharing tests.
const APPROX_ZERO: f64 = 1e-9;

/// Dense handle of a boundary face within its [`crate::Boundary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub(crate) u32);

impl FaceId {
    /// Returns the underlying index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An oriented face between an interior leaf and non-interior space.
///
/// `interior` is always a leaf the active scheme labels interior.
/// `exterior` is the non-interior neighbor on `direction`, or `None`
/// when the face borders unbounded space outside the tree.
///
/// The face square's geometry is dictated by the smaller of the two
/// nodes: its halfwidth is the minimum of the two node halfwidths and
/// its center is the shared-face center biased toward the smaller
/// node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundaryFace {
    /// The interior leaf.
    pub interior: NodeId,
    /// The exterior leaf, or `None` for unbounded exterior.
    pub exterior: Option<NodeId>,
    /// The face of `interior` that separates the two.
    pub direction: CubeFace,
}

impl BoundaryFace {
    /// Outward unit normal (from interior toward exterior).
    #[inline]
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.direction.normal()
    }

    /// Halfwidth of the face square: the smaller node decides.
    #[must_use]
    pub fn halfwidth(&self, tree: &Octree) -> f64 {
        let hw_i = tree.node(self.interior).halfwidth;
        match self.exterior {
            Some(e) => hw_i.min(tree.node(e).halfwidth),
            None => hw_i,
        }
    }

    /// Face area, `4 * min(hw_i, hw_e)^2`.
    #[must_use]
    pub fn area(&self, tree: &Octree) -> f64 {
        let hw = self.halfwidth(tree);
        4.0 * hw * hw
    }

    /// Grid-aligned face center, biased toward the smaller node.
    #[must_use]
    pub fn center(&self, tree: &Octree) -> Point3<f64> {
        // Whichever node is smaller dictates the position; from its
        // center, step one halfwidth along the separating face.
        let interior_node = tree.node(self.interior);
        let (origin, hw, face) = match self.exterior {
            Some(e) if tree.node(e).halfwidth < interior_node.halfwidth => {
                let ext = tree.node(e);
                (ext.center, ext.halfwidth, self.direction.opposite())
            }
            _ => (
                interior_node.center,
                interior_node.halfwidth,
                self.direction,
            ),
        };
        origin + hw * face.normal()
    }

    /// Checks whether two faces share a geometric edge.
    ///
    /// Same-direction faces share an edge when they are coplanar and
    /// their 2D projections abut. Perpendicular faces share an edge
    /// when the component of their center displacement perpendicular
    /// to the edge axis matches `n_a*hw_b - n_b*hw_a` (convex corner)
    /// or its negation (concave corner), and the displacement along
    /// the axis is shorter than the larger halfwidth. Opposing faces
    /// never share an edge.
    #[must_use]
    pub fn shares_edge_with(&self, other: &Self, tree: &Octree) -> bool {
        if self.direction.opposite() == other.direction {
            return false;
        }

        let hw = self.halfwidth(tree);
        let ohw = other.halfwidth(tree);
        let center = self.center(tree);
        let other_center = other.center(tree);

        if self.direction == other.direction {
            // Coplanar in-plane abutment: project both squares onto
            // the face plane's two free axes.
            let axis = self.direction.axis();
            let (u, v) = plane_axes(axis);
            let a_u = [center[u] - hw, center[u] + hw];
            let a_v = [center[v] - hw, center[v] + hw];
            let b_u = [other_center[u] - ohw, other_center[u] + ohw];
            let b_v = [other_center[v] - ohw, other_center[v] + ohw];
            if (center[axis] - other_center[axis]).abs() > APPROX_ZERO {
                return false;
            }
            return aabb_pair_abut(a_u, a_v, b_u, b_v);
        }

        // Perpendicular faces: the shared edge runs along the cross of
        // the two normals.
        let norm = self.normal();
        let other_norm = other.normal();
        let disp = center - other_center;
        let axis = norm.cross(&other_norm);
        let disp_along = disp.dot(&axis) * axis;
        let disp_perp = disp - disp_along;

        // Displacement expected of an inner or outer corner pairing.
        let expected = norm * ohw - other_norm * hw;
        let convex = (expected - disp_perp).norm_squared() <= APPROX_ZERO;
        let concave = (expected + disp_perp).norm_squared() <= APPROX_ZERO;
        if !convex && !concave {
            return false;
        }

        // The squares must overlap along the edge axis.
        disp_along.norm() < hw.max(ohw)
    }
}

/// The two in-plane axes for a face perpendicular to `axis`.
pub(crate) const fn plane_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    }
}

/// True when two 2D boxes touch along an edge without overlapping
/// interiors along the touching axis.
fn aabb_pair_abut(a_u: [f64; 2], a_v: [f64; 2], b_u: [f64; 2], b_v: [f64; 2]) -> bool {
    let touch_u =
        (a_u[1] - b_u[0]).abs() <= APPROX_ZERO || (b_u[1] - a_u[0]).abs() <= APPROX_ZERO;
    let touch_v =
        (a_v[1] - b_v[0]).abs() <= APPROX_ZERO || (b_v[1] - a_v[0]).abs() <= APPROX_ZERO;
    let overlap_u = a_u[1].min(b_u[1]) - a_u[0].max(b_u[0]) > APPROX_ZERO;
    let overlap_v = a_v[1].min(b_v[1]) - a_v[0].max(b_v[0]) > APPROX_ZERO;
    (touch_u && overlap_v) || (touch_v && overlap_u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_octree::LeafData;

    /// A 4x4x4 grid with a 2x1x1 solid bar, giving same-direction and
    /// perpendicular boundary-face pairs.
    fn bar_tree() -> (Octree, NodeId, NodeId) {
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        let a = tree.insert_point(&Point3::new(-0.5, 0.5, 0.5)).unwrap();
        let b = tree.insert_point(&Point3::new(0.5, 0.5, 0.5)).unwrap();
        for id in [a, b] {
            tree.set_leaf_data(id, LeafData::from_sample(1.0, 0.9, 0.0, 0.0, 0.0))
                .unwrap();
        }
        (tree, a, b)
    }

    #[test]
    fn geometry_of_an_unbounded_face() {
        let (tree, a, _) = bar_tree();
        let f = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::YPlus,
        };
        assert_eq!(f.halfwidth(&tree), 0.5);
        assert!((f.area(&tree) - 1.0).abs() < 1e-12);
        let c = f.center(&tree);
        assert!((c - Point3::new(-0.5, 1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn same_direction_abutting_faces_share_an_edge() {
        let (tree, a, b) = bar_tree();
        let fa = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::ZPlus,
        };
        let fb = BoundaryFace {
            interior: b,
            exterior: None,
            direction: CubeFace::ZPlus,
        };
        assert!(fa.shares_edge_with(&fb, &tree));
        assert!(fb.shares_edge_with(&fa, &tree));
    }

    #[test]
    fn perpendicular_faces_at_a_convex_corner_share_an_edge() {
        let (tree, a, _) = bar_tree();
        // The top face and the -x end face of the same leaf meet at a
        // convex corner edge.
        let top = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::ZPlus,
        };
        let end = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::XMinus,
        };
        assert!(top.shares_edge_with(&end, &tree));
    }

    #[test]
    fn distant_and_opposing_faces_do_not() {
        let (tree, a, b) = bar_tree();
        let top_a = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::ZPlus,
        };
        let bottom_b = BoundaryFace {
            interior: b,
            exterior: None,
            direction: CubeFace::ZMinus,
        };
        // Opposing directions never pair.
        assert!(!top_a.shares_edge_with(&bottom_b, &tree));

        // Same direction but separated by a full cell: the far end
        // faces of the bar are parallel planes one apart.
        let end_a = BoundaryFace {
            interior: a,
            exterior: None,
            direction: CubeFace::XMinus,
        };
        let end_b = BoundaryFace {
            interior: b,
            exterior: None,
            direction: CubeFace::XMinus,
        };
        assert!(!end_a.shares_edge_with(&end_b, &tree));
    }
}
