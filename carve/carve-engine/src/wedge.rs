//! The inter-frame carve wedge.

use crate::RayCarve;
use carve_octree::{BoxRelation, CarveShape, LeafData};
use carve_types::{Aabb, Result};
use nalgebra::Point3;

/// Number of golden-section iterations used to locate the closest
/// blended ray. Twelve brackets the blend parameter to ~0.5% of its
/// range, well under a voxel at scan geometry scales.
const BLEND_ITERS: usize = 12;

const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// The probabilistic envelope swept between two consecutive-frame
/// scan rays.
///
/// A scanner moving between poses observes the same surface patch
/// along two nearby rays; the volume between them was traversed by
/// the beam even though no sample lies exactly inside it. The wedge
/// carves that volume by blending linearly between the two rays and
/// applying the blended ray's occupancy model to each leaf.
#[derive(Debug, Clone)]
pub struct CarveWedge {
    a0: Point3<f64>,
    b0: Point3<f64>,
    a1: Point3<f64>,
    b1: Point3<f64>,
    weight: f64,
    surface_prior: f64,
    planar_prior: f64,
    corner_prior: f64,
    band: f64,
}

impl CarveWedge {
    /// Builds a wedge between rays `a0 -> b0` and `a1 -> b1`.
    ///
    /// # Errors
    ///
    /// Returns [`carve_types::CarveError::InvalidInput`] under the
    /// same rules as [`RayCarve::new`], applied to both boundary rays.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a0: Point3<f64>,
        b0: Point3<f64>,
        a1: Point3<f64>,
        b1: Point3<f64>,
        weight: f64,
        surface_prior: f64,
        planar_prior: f64,
        corner_prior: f64,
        band: f64,
    ) -> Result<Self> {
        // Both boundary rays must individually be valid carve rays.
        RayCarve::new(a0, b0, weight, surface_prior, planar_prior, corner_prior, band)?;
        RayCarve::new(a1, b1, weight, surface_prior, planar_prior, corner_prior, band)?;
        Ok(Self {
            a0,
            b0,
            a1,
            b1,
            weight,
            surface_prior,
            planar_prior,
            corner_prior,
            band,
        })
    }

    /// The blended ray at blend parameter `s` in `[0, 1]`.
    fn blended(&self, s: f64) -> Result<RayCarve> {
        let a = Point3::from(self.a0.coords.lerp(&self.a1.coords, s));
        let b = Point3::from(self.b0.coords.lerp(&self.b1.coords, s));
        RayCarve::new(
            a,
            b,
            self.weight,
            self.surface_prior,
            self.planar_prior,
            self.corner_prior,
            self.band,
        )
    }

    /// Distance from a point to the segment of the blended ray at `s`.
    fn distance_at(&self, s: f64, p: &Point3<f64>) -> f64 {
        let a = self.a0.coords.lerp(&self.a1.coords, s);
        let b = self.b0.coords.lerp(&self.b1.coords, s);
        let ab = b - a;
        let len_sq = ab.norm_squared();
        if len_sq <= f64::EPSILON {
            return (p.coords - a).norm();
        }
        let t = ((p.coords - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
        (p.coords - (a + t * ab)).norm()
    }

    /// Finds the blend parameter whose ray passes closest to `p`.
    ///
    /// The distance is convex in the blend parameter for linearly
    /// interpolated endpoints, so a golden-section scan converges.
    fn closest_blend(&self, p: &Point3<f64>) -> f64 {
        let (mut lo, mut hi) = (0.0f64, 1.0f64);
        let mut m1 = hi - (hi - lo) * INV_PHI;
        let mut m2 = lo + (hi - lo) * INV_PHI;
        let mut d1 = self.distance_at(m1, p);
        let mut d2 = self.distance_at(m2, p);
        for _ in 0..BLEND_ITERS {
            if d1 <= d2 {
                hi = m2;
                m2 = m1;
                d2 = d1;
                m1 = hi - (hi - lo) * INV_PHI;
                d1 = self.distance_at(m1, p);
            } else {
                lo = m1;
                m1 = m2;
                d1 = d2;
                m2 = lo + (hi - lo) * INV_PHI;
                d2 = self.distance_at(m2, p);
            }
        }
        0.5 * (lo + hi)
    }
}

impl CarveShape for CarveWedge {
    fn aabb(&self) -> Aabb {
        Aabb::new(self.a0, self.b0)
            .union(&Aabb::new(self.a1, self.b1))
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        let node_box = Aabb::from_center_halfwidth(center, halfwidth);
        if !self.aabb().intersects(&node_box) {
            return BoxRelation::Disjoint;
        }
        // The box can only meet the swept sheet if its circumsphere
        // reaches the closest blended ray.
        let s = self.closest_blend(center);
        if self.distance_at(s, center) > halfwidth * 3f64.sqrt() {
            return BoxRelation::Disjoint;
        }
        BoxRelation::Straddles
    }

    fn apply_to_leaf(&self, data: &mut LeafData, center: &Point3<f64>, halfwidth: f64) {
        let s = self.closest_blend(center);
        if let Ok(ray) = self.blended(s) {
            ray.apply_to_leaf(data, center, halfwidth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_wedge() -> CarveWedge {
        // Two parallel rays one meter apart, both shooting down +x.
        CarveWedge::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(10.0, 1.0, 0.0),
            1.0,
            0.5,
            0.5,
            0.5,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn rejects_degenerate_boundary_rays() {
        let p = Point3::origin();
        assert!(CarveWedge::new(
            p,
            p,
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(10.0, 1.0, 0.0),
            1.0,
            0.5,
            0.5,
            0.5,
            1.0
        )
        .is_err());
    }

    #[test]
    fn closest_blend_tracks_the_query_point() {
        let w = flat_wedge();
        assert!(w.closest_blend(&Point3::new(5.0, 0.0, 0.0)) < 0.05);
        assert!(w.closest_blend(&Point3::new(5.0, 1.0, 0.0)) > 0.95);
        let mid = w.closest_blend(&Point3::new(5.0, 0.5, 0.0));
        assert!((mid - 0.5).abs() < 0.05);
    }

    #[test]
    fn carves_between_the_boundary_rays() {
        let w = flat_wedge();
        // A box between the two rays is touched.
        assert_eq!(
            w.classify(&Point3::new(5.0, 0.5, 0.0), 0.5),
            BoxRelation::Straddles
        );
        // Far off to the side it is not.
        assert_eq!(
            w.classify(&Point3::new(5.0, 8.0, 0.0), 0.5),
            BoxRelation::Disjoint
        );
    }

    #[test]
    fn occupancy_follows_the_blended_ray() {
        let w = flat_wedge();
        let mut near = LeafData::new();
        w.apply_to_leaf(&mut near, &Point3::new(0.5, 0.5, 0.0), 0.5);
        assert!(near.probability() < 0.5);

        let mut far = LeafData::new();
        w.apply_to_leaf(&mut far, &Point3::new(9.5, 0.5, 0.0), 0.5);
        assert!(far.probability() > 0.5);
    }
}
