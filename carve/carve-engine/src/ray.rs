//! The weighted scan-ray carve shape.

use carve_octree::{BoxRelation, CarveShape, LeafData};
use carve_types::{Aabb, CarveError, Result};
use nalgebra::{Point3, Vector3};

/// A single weighted scan ray carving free space into the tree.
///
/// The segment runs from the sensor origin to the measured surface
/// point. Leaves along the run accumulate low-occupancy samples;
/// leaves in the transition band near the endpoint accumulate
/// high-occupancy samples plus the attenuated geometric priors. See
/// the crate docs for the exact occupancy model.
#[derive(Debug, Clone)]
pub struct RayCarve {
    start: Point3<f64>,
    end: Point3<f64>,
    direction: Vector3<f64>,
    length: f64,
    weight: f64,
    surface_prior: f64,
    corner_prior: f64,
    planar_prior: f64,
    band: f64,
}

impl RayCarve {
    /// Builds a carve ray.
    ///
    /// `band` is the transition bandwidth of the occupancy model,
    /// normally the tree resolution.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for non-finite endpoints,
    /// coincident endpoints, a non-positive weight, a non-positive
    /// band, or priors outside `[0, 1]`.
    pub fn new(
        start: Point3<f64>,
        end: Point3<f64>,
        weight: f64,
        surface_prior: f64,
        planar_prior: f64,
        corner_prior: f64,
        band: f64,
    ) -> Result<Self> {
        let finite = start.iter().chain(end.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(CarveError::invalid_input("ray endpoints must be finite"));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "ray weight must be positive, got {weight}"
            )));
        }
        if !band.is_finite() || band <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "transition band must be positive, got {band}"
            )));
        }
        for (name, v) in [
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

        let dir = end - start;
        let length = dir.norm();
        if length <= 0.0 {
            return Err(CarveError::invalid_input(
                "ray endpoints must not coincide",
            ));
        }

        Ok(Self {
            start,
            end,
            direction: dir,
            length,
            weight,
            surface_prior,
            corner_prior,
            planar_prior,
            band,
        })
    }

    /// The occupancy sample at arc length `d` along the ray.
    #[must_use]
    pub fn occupancy_at(&self, d: f64) -> f64 {
        let x = 4.0 * (d - (self.length - self.band)) / self.band;
        1.0 / (1.0 + (-x).exp())
    }

    /// Segment length in meters.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Intersection of the ray parameter interval `[0, 1]` with a box,
    /// or `None` when the segment misses the box.
    ///
    /// Slab method over the three axes; axes with zero direction
    /// reject when the origin lies outside the slab.
    fn param_range(&self, center: &Point3<f64>, halfwidth: f64) -> Option<(f64, f64)> {
        let mut tmin = 0.0f64;
        let mut tmax = 1.0f64;
        for axis in 0..3 {
            let o = self.start[axis];
            let d = self.direction[axis];
            let lo = center[axis] - halfwidth;
            let hi = center[axis] + halfwidth;
            if d.abs() < f64::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = if inv >= 0.0 {
                ((lo - o) * inv, (hi - o) * inv)
            } else {
                ((hi - o) * inv, (lo - o) * inv)
            };
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmin > tmax {
                return None;
            }
        }
        Some((tmin, tmax))
    }
}

impl CarveShape for RayCarve {
    fn aabb(&self) -> Aabb {
        Aabb::new(self.start, self.end)
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        // A segment has no volume, so a box is never inside it.
        match self.param_range(center, halfwidth) {
            Some(_) => BoxRelation::Straddles,
            None => BoxRelation::Disjoint,
        }
    }

    fn apply_to_leaf(&self, data: &mut LeafData, center: &Point3<f64>, halfwidth: f64) {
        let Some((t0, t1)) = self.param_range(center, halfwidth) else {
            return;
        };
        let d = 0.5 * (t0 + t1) * self.length;
        let p = self.occupancy_at(d);
        let envelope = 4.0 * p * (1.0 - p);
        data.add_sample(
            self.weight,
            p,
            self.surface_prior * envelope,
            self.corner_prior * envelope,
            self.planar_prior * envelope,
        );
    }
}
