//! Geometry stamps: solid boxes and plane seeds.

use carve_octree::{BoxRelation, CarveShape, LeafData};
use carve_types::{Aabb, CarveError, Result};
use nalgebra::{Point3, Vector3};

/// An axis-aligned solid box stamping a fixed sample into every
/// intersected leaf.
///
/// Used to seed known-solid geometry (calibration targets, synthetic
/// scenes) and by the test suites to build exact solids without a
/// scan stream. Priors are stamped as given, not attenuated.
#[derive(Debug, Clone)]
pub struct SolidBox {
    bounds: Aabb,
    weight: f64,
    occupancy: f64,
    surface_prior: f64,
    corner_prior: f64,
    planar_prior: f64,
}

impl SolidBox {
    /// Builds a solid box stamp.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for a degenerate box, a
    /// non-positive weight, or occupancy/priors outside `[0, 1]`.
    pub fn new(
        bounds: Aabb,
        weight: f64,
        occupancy: f64,
        surface_prior: f64,
        planar_prior: f64,
        corner_prior: f64,
    ) -> Result<Self> {
        if bounds.is_degenerate() {
            return Err(CarveError::invalid_input("solid box bounds are degenerate"));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "solid box weight must be positive, got {weight}"
            )));
        }
        for (name, v) in [
            ("occupancy", occupancy),
            ("surface_prior", surface_prior),
            ("planar_prior", planar_prior),
            ("corner_prior", corner_prior),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CarveError::invalid_input(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        Ok(Self {
            bounds,
            weight,
            occupancy,
            surface_prior,
            corner_prior,
            planar_prior,
        })
    }

    /// A fully-solid stamp with maximal planarity, the common case in
    /// synthetic scenes.
    ///
    /// # Errors
    ///
    /// Propagates the validation of [`SolidBox::new`].
    pub fn solid(bounds: Aabb, weight: f64) -> Result<Self> {
        Self::new(bounds, weight, 1.0, 1.0, 1.0, 0.0)
    }
}

impl CarveShape for SolidBox {
    fn aabb(&self) -> Aabb {
        self.bounds
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        let node_box = Aabb::from_center_halfwidth(center, halfwidth);
        // Face-touching boxes share no volume and receive no sample.
        let disjoint = self.bounds.min.x >= node_box.max.x
            || self.bounds.max.x <= node_box.min.x
            || self.bounds.min.y >= node_box.max.y
            || self.bounds.max.y <= node_box.min.y
            || self.bounds.min.z >= node_box.max.z
            || self.bounds.max.z <= node_box.min.z;
        if disjoint {
            return BoxRelation::Disjoint;
        }
        if self.bounds.contains_box(&node_box) {
            BoxRelation::Inside
        } else {
            BoxRelation::Straddles
        }
    }

    fn apply_to_leaf(&self, data: &mut LeafData, _center: &Point3<f64>, _halfwidth: f64) {
        data.add_sample(
            self.weight,
            self.occupancy,
            self.surface_prior,
            self.corner_prior,
            self.planar_prior,
        );
    }
}

/// A bounded plane patch stamping samples into straddling leaves.
///
/// The patch is a square of the given radius (in the L-inf sense)
/// around its center. Leaves whose boxes cross the plane within the
/// patch receive the stamp; nothing is ever fully inside a plane, so
/// the walk refines every touched leaf to max depth.
#[derive(Debug, Clone)]
pub struct PlaneSeed {
    center: Point3<f64>,
    normal: Vector3<f64>,
    radius: f64,
    weight: f64,
    occupancy: f64,
    planar_prior: f64,
}

impl PlaneSeed {
    /// Builds a plane seed patch.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for a zero normal, a
    /// non-positive radius or weight, or occupancy outside `[0, 1]`.
    pub fn new(
        center: Point3<f64>,
        normal: Vector3<f64>,
        radius: f64,
        weight: f64,
        occupancy: f64,
        planar_prior: f64,
    ) -> Result<Self> {
        let norm = normal.norm();
        if !norm.is_finite() || norm <= 0.0 {
            return Err(CarveError::invalid_input("plane normal must be non-zero"));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "plane radius must be positive, got {radius}"
            )));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "plane weight must be positive, got {weight}"
            )));
        }
        if !(0.0..=1.0).contains(&occupancy) || !(0.0..=1.0).contains(&planar_prior) {
            return Err(CarveError::invalid_input(
                "plane occupancy and planarity must be in [0, 1]",
            ));
        }
        Ok(Self {
            center,
            normal: normal / norm,
            radius,
            weight,
            occupancy,
            planar_prior,
        })
    }
}

impl CarveShape for PlaneSeed {
    fn aabb(&self) -> Aabb {
        Aabb::from_center_halfwidth(&self.center, self.radius)
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        let node_box = Aabb::from_center_halfwidth(center, halfwidth);
        if !self.aabb().intersects(&node_box) {
            return BoxRelation::Disjoint;
        }
        // Projection radius of the box onto the plane normal.
        let reach = halfwidth * (self.normal.x.abs() + self.normal.y.abs() + self.normal.z.abs());
        let dist = self.normal.dot(&(center - self.center));
        if dist.abs() > reach {
            return BoxRelation::Disjoint;
        }
        BoxRelation::Straddles
    }

    fn apply_to_leaf(&self, data: &mut LeafData, _center: &Point3<f64>, _halfwidth: f64) {
        data.add_sample(self.weight, self.occupancy, 1.0, 0.0, self.planar_prior);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_box_classification() {
        let b = SolidBox::solid(
            Aabb::new(Point3::origin(), Point3::new(4.0, 4.0, 4.0)),
            1.0,
        )
        .unwrap();

        assert_eq!(
            b.classify(&Point3::new(2.0, 2.0, 2.0), 1.0),
            BoxRelation::Inside
        );
        assert_eq!(
            b.classify(&Point3::new(4.0, 2.0, 2.0), 1.0),
            BoxRelation::Straddles
        );
        assert_eq!(
            b.classify(&Point3::new(9.0, 2.0, 2.0), 1.0),
            BoxRelation::Disjoint
        );
    }

    #[test]
    fn solid_box_stamps_priors_unattenuated() {
        let b = SolidBox::solid(
            Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)),
            2.0,
        )
        .unwrap();
        let mut data = LeafData::new();
        b.apply_to_leaf(&mut data, &Point3::new(0.5, 0.5, 0.5), 0.5);
        assert!(data.is_interior());
        assert!((data.planarity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn plane_seed_hits_straddling_boxes_only() {
        let p = PlaneSeed::new(
            Point3::origin(),
            Vector3::z(),
            10.0,
            1.0,
            0.5,
            1.0,
        )
        .unwrap();

        assert_eq!(
            p.classify(&Point3::new(0.0, 0.0, 0.25), 0.5),
            BoxRelation::Straddles
        );
        assert_eq!(
            p.classify(&Point3::new(0.0, 0.0, 3.0), 0.5),
            BoxRelation::Disjoint
        );
        assert_eq!(
            p.classify(&Point3::new(20.0, 0.0, 0.0), 0.5),
            BoxRelation::Disjoint
        );
    }

    #[test]
    fn validation_rejects_nonsense() {
        assert!(SolidBox::solid(
            Aabb::new(Point3::origin(), Point3::origin()),
            1.0
        )
        .is_err());
        assert!(PlaneSeed::new(
            Point3::origin(),
            Vector3::zeros(),
            1.0,
            1.0,
            0.5,
            1.0
        )
        .is_err());
    }
}
