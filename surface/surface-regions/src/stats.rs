//! Per-face statistics from the incident leaf distributions.
//!
//! A boundary face separates an interior leaf (occupancy mean `mu_i`,
//! variance `var_i`, halfwidth `hw_i`) from an exterior leaf (or
//! unbounded space, modeled as `mu = 0.5`, `var = 1`, `hw = 0`). The
//! probability-1/2 crossing between the two node centers sits at the
//! normalized position
//!
//! ```text
//! s = (mu_i - 0.5) / (mu_i - mu_e)
//! ```
//!
//! which linearizes the interpolated distribution between the centers.
//! A face whose two sides sit on the same side of 1/2 is *hidden*
//! (it only exists because a segmentation scheme relabeled a leaf);
//! its crossing is ill-defined and its geometry stays grid-aligned.

use carve_octree::Octree;
use carve_types::Point3;
use surface_boundary::BoundaryFace;

/// Guard for the `mu_i - mu_e` denominator.
const APPROX_ZERO: f64 = 1e-9;

struct FaceSides {
    mu_i: f64,
    var_i: f64,
    hw_i: f64,
    planar_i: f64,
    mu_e: f64,
    var_e: f64,
    hw_e: f64,
    planar_e: f64,
}

impl FaceSides {
    fn of(tree: &Octree, face: &BoundaryFace) -> Self {
        let interior = tree.node(face.interior);
        let (mu_i, var_i, planar_i) = match tree.leaf_data(face.interior) {
            Some(d) => (d.probability(), d.uncertainty(), d.planarity()),
            None => (0.5, 1.0, 0.0),
        };
        let (mu_e, var_e, hw_e, planar_e) = match face.exterior {
            Some(e) => {
                let node = tree.node(e);
                match tree.leaf_data(e) {
                    Some(d) => (
                        d.probability(),
                        d.uncertainty(),
                        node.halfwidth,
                        d.planarity(),
                    ),
                    // An unobserved neighbor behaves like unbounded
                    // space but keeps its physical extent.
                    None => (0.5, 1.0, node.halfwidth, planar_i),
                }
            }
            None => (0.5, 1.0, 0.0, planar_i),
        };
        Self {
            mu_i,
            var_i,
            hw_i: interior.halfwidth,
            planar_i,
            mu_e,
            var_e,
            hw_e,
            planar_e,
        }
    }

    /// A face is hidden when both sides sit strictly on the same side
    /// of probability 1/2, or the sides are indistinguishable.
    fn is_hidden(&self) -> bool {
        (self.mu_i - 0.5) * (self.mu_e - 0.5) > 0.0
            || (self.mu_i - self.mu_e).abs() < APPROX_ZERO
    }

    fn crossing(&self) -> f64 {
        (self.mu_i - 0.5) / (self.mu_i - self.mu_e)
    }
}

/// Planarity of a face: the crossing-weighted blend of the two
/// incident leaves' planarity estimates, in `[0, 1]`.
#[must_use]
pub fn face_planarity(tree: &Octree, face: &BoundaryFace) -> f64 {
    let sides = FaceSides::of(tree, face);
    if sides.is_hidden() {
        // No usable crossing; weight both sides evenly.
        return 0.5 * (sides.planar_i + sides.planar_e);
    }
    let s = sides.crossing().clamp(0.0, 1.0);
    s.mul_add(sides.planar_e, (1.0 - s) * sides.planar_i)
}

/// Sub-voxel face position on the occupancy isosurface.
///
/// For a hidden face (or with `use_isosurface` off) this is the
/// grid-aligned face center. Otherwise the position starts at the
/// interior leaf center and moves `s * (hw_i + hw_e)` along the
/// outward normal, landing on the expected probability-1/2 crossing
/// between the two node centers.
#[must_use]
pub fn isosurface_position(
    tree: &Octree,
    face: &BoundaryFace,
    use_isosurface: bool,
) -> Point3<f64> {
    let sides = FaceSides::of(tree, face);
    if !use_isosurface || sides.is_hidden() {
        return face.center(tree);
    }
    let s = sides.crossing();
    tree.node(face.interior).center + face.normal() * (s * (sides.hw_i + sides.hw_e))
}

/// Variance of the face position along the face normal.
///
/// Linearizing `s(p_i, p_e)` around the means with independent sides
/// gives `var_s = (1 - s^2) var_i + s^2 var_e`, scaled by the squared
/// center distance `(hw_i + hw_e)^2`. A hidden face has no crossing;
/// its position is uniform over the overlap span, with variance
/// `(hw_e - hw_i)^2 / 12`.
#[must_use]
pub fn position_variance(tree: &Octree, face: &BoundaryFace) -> f64 {
    let sides = FaceSides::of(tree, face);
    if sides.is_hidden() {
        let span = sides.hw_e - sides.hw_i;
        return span * span / 12.0;
    }
    let s = sides.crossing();
    let ss = s * s;
    let var_s = (1.0 - ss).mul_add(sides.var_i, ss * sides.var_e);
    let scale = sides.hw_i + sides.hw_e;
    scale * scale * var_s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carve_octree::LeafData;
    use carve_types::CubeFace;
    use nalgebra::Point3 as P3;

    /// Adjacent solid/empty leaves sharing the +x face of the solid.
    /// Each side carries two spread samples so the payload variance is
    /// small but non-zero (0.01 on both sides).
    fn two_sided(p_int: f64, p_ext: f64) -> (Octree, BoundaryFace) {
        let mut tree = Octree::with_domain(P3::origin(), 1.0, 1.0).unwrap();
        let interior = tree.insert_point(&P3::new(-0.5, 0.5, 0.5)).unwrap();
        let exterior = tree.insert_point(&P3::new(0.5, 0.5, 0.5)).unwrap();
        let mut di = LeafData::from_sample(1.0, p_int + 0.1, 0.0, 0.0, 0.8);
        di.add_sample(1.0, p_int - 0.1, 0.0, 0.0, 0.8);
        let mut de = LeafData::from_sample(1.0, p_ext + 0.1, 0.0, 0.0, 0.4);
        de.add_sample(1.0, p_ext - 0.1, 0.0, 0.0, 0.4);
        tree.set_leaf_data(interior, di).unwrap();
        tree.set_leaf_data(exterior, de).unwrap();
        let face = BoundaryFace {
            interior,
            exterior: Some(exterior),
            direction: CubeFace::XPlus,
        };
        (tree, face)
    }

    fn unbounded(p_int: f64) -> (Octree, BoundaryFace) {
        let mut tree = Octree::with_domain(P3::origin(), 1.0, 1.0).unwrap();
        let interior = tree.insert_point(&P3::new(-0.5, 0.5, 0.5)).unwrap();
        tree.set_leaf_data(interior, LeafData::from_sample(1.0, p_int, 0.0, 0.0, 0.8))
            .unwrap();
        let face = BoundaryFace {
            interior,
            exterior: None,
            direction: CubeFace::XPlus,
        };
        (tree, face)
    }

    #[test]
    fn symmetric_crossing_lands_on_the_grid_face() {
        let (tree, face) = two_sided(0.9, 0.1);
        // s = 0.4/0.8 = 0.5: midway between the centers = the grid
        // face plane.
        let pos = isosurface_position(&tree, &face, true);
        assert_relative_eq!(pos.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pos.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(pos.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn asymmetric_crossing_biases_toward_the_weak_side() {
        // Interior barely solid: the crossing hugs the interior
        // center.
        let (tree, face) = two_sided(0.6, 0.0);
        let pos = isosurface_position(&tree, &face, true);
        // s = 0.1/0.6 = 1/6 of the center span from the interior
        // center at x = -0.5.
        assert_relative_eq!(pos.x, -0.5 + 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn grid_position_when_isosurface_is_disabled() {
        let (tree, face) = two_sided(0.9, 0.1);
        let pos = isosurface_position(&tree, &face, false);
        assert_relative_eq!(pos.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn unbounded_exterior_puts_the_face_on_the_hull() {
        let (tree, face) = unbounded(0.9);
        // mu_e = 0.5 exactly: s = 1, hw_e = 0, so the position is the
        // interior center pushed one halfwidth out - the node face.
        let pos = isosurface_position(&tree, &face, true);
        assert_relative_eq!(pos.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn variance_combines_both_sides() {
        let (tree, face) = two_sided(0.9, 0.1);
        let v = position_variance(&tree, &face);
        // s = 0.5; var_i and var_e are equal here, so
        // var_s = var_i and the scale is (0.5 + 0.5)^2 = 1.
        let var_i = tree
            .leaf_data(face.interior)
            .unwrap()
            .uncertainty();
        assert_relative_eq!(v, var_i, epsilon = 1e-12);
        assert!(v > 0.0);
    }

    #[test]
    fn hidden_face_uses_the_uniform_span() {
        // Two solid leaves on the same side of 1/2 (a scheme-induced
        // face): equal sizes give zero positional variance.
        let (tree, face) = two_sided(0.9, 0.8);
        let v = position_variance(&tree, &face);
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        // And the position stays grid-aligned.
        let pos = isosurface_position(&tree, &face, true);
        assert_relative_eq!(pos.x, 0.0, epsilon = 1e-12);

        // Sanity: the face still reports a finite planarity blend.
        let p = face_planarity(&tree, &face);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn planarity_blends_by_crossing() {
        let (tree, face) = two_sided(0.9, 0.1);
        // s = 0.5: even blend of 0.8 and 0.4.
        assert_relative_eq!(face_planarity(&tree, &face), 0.6, epsilon = 1e-12);
    }
}
