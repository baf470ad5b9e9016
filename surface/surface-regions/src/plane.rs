//! Least-squares plane fitting.

use carve_types::{Point3, Vector3};
use nalgebra::{Matrix3, SymmetricEigen};

/// A plane through a point with a unit normal.
///
/// Fitted planes minimize squared point-to-plane distance; the normal
/// is the eigenvector of the point covariance with the smallest
/// eigenvalue. Nearly-collinear point sets leave that direction
/// ill-determined, in which case the fit falls back to a caller
/// supplied normal (typically the region seed face's normal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFit {
    /// A point on the plane (the centroid, for fitted planes).
    pub point: Point3<f64>,
    /// Unit normal.
    pub normal: Vector3<f64>,
}

impl PlaneFit {
    /// A plane from an explicit point and normal; the normal is
    /// normalized and falls back to `+z` when degenerate.
    #[must_use]
    pub fn from_point_normal(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        let norm = normal.norm();
        let normal = if norm > 0.0 && norm.is_finite() {
            normal / norm
        } else {
            Vector3::z()
        };
        Self { point, normal }
    }

    /// Least-squares fit through a point set.
    ///
    /// The plane passes through the centroid; the normal is the
    /// smallest-eigenvalue eigenvector of the covariance. When fewer
    /// than three points are given, or the two smallest eigenvalues
    /// are within `min_singular_value` of the largest (no unique
    /// normal direction), `fallback_normal` is used instead.
    #[must_use]
    pub fn fit(
        points: &[Point3<f64>],
        fallback_normal: Vector3<f64>,
        min_singular_value: f64,
    ) -> Self {
        if points.is_empty() {
            return Self::from_point_normal(Point3::origin(), fallback_normal);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let mut centroid = Vector3::zeros();
        for p in points {
            centroid += p.coords;
        }
        centroid /= n;
        let point = Point3::from(centroid);

        if points.len() < 3 {
            return Self::from_point_normal(point, fallback_normal);
        }

        let mut cov = Matrix3::zeros();
        for p in points {
            let d = p.coords - centroid;
            cov += d * d.transpose();
        }
        cov /= n;

        let eig = SymmetricEigen::new(cov);
        // Sort the three eigenpairs by eigenvalue.
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
        let [lo, mid, hi] = order;

        // Ill-conditioned fit: the normal direction is not unique.
        let spread = eig.eigenvalues[mid] - eig.eigenvalues[lo];
        if spread <= min_singular_value * eig.eigenvalues[hi].max(f64::EPSILON) {
            return Self::from_point_normal(point, fallback_normal);
        }

        Self::from_point_normal(point, eig.eigenvectors.column(lo).into_owned())
    }

    /// Unsigned distance from a point to the plane.
    #[must_use]
    pub fn distance_to(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point)).abs()
    }

    /// Signed distance from a point to the plane, positive on the
    /// normal side.
    #[must_use]
    pub fn signed_distance_to(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fits_an_axis_aligned_plane() {
        let mut points = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                points.push(Point3::new(f64::from(x), f64::from(y), 2.0));
            }
        }
        let plane = PlaneFit::fit(&points, Vector3::x(), 0.1);
        assert_relative_eq!(plane.normal.z.abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(plane.point.z, 2.0, epsilon = 1e-12);
        for p in &points {
            assert!(plane.distance_to(p) < 1e-9);
        }
    }

    #[test]
    fn fits_a_tilted_plane() {
        // z = x: normal along (1, 0, -1)/sqrt(2).
        let mut points = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                points.push(Point3::new(f64::from(x), f64::from(y), f64::from(x)));
            }
        }
        let plane = PlaneFit::fit(&points, Vector3::z(), 0.1);
        let expected = Vector3::new(1.0, 0.0, -1.0).normalize();
        assert_relative_eq!(plane.normal.dot(&expected).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn collinear_points_fall_back() {
        let points: Vec<_> = (0..8)
            .map(|i| Point3::new(f64::from(i), 0.0, 0.0))
            .collect();
        let fallback = Vector3::new(0.0, 1.0, 0.0);
        let plane = PlaneFit::fit(&points, fallback, 0.1);
        assert_relative_eq!(plane.normal.dot(&fallback).abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn tiny_point_sets_fall_back() {
        let points = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let plane = PlaneFit::fit(&points, Vector3::z(), 0.1);
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-12);
        // Centroid is still honored.
        assert_relative_eq!(plane.point.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn signed_distance_sides() {
        let plane = PlaneFit::from_point_normal(Point3::origin(), Vector3::z());
        assert!(plane.signed_distance_to(&Point3::new(0.0, 0.0, 1.0)) > 0.0);
        assert!(plane.signed_distance_to(&Point3::new(0.0, 0.0, -1.0)) < 0.0);
        assert_relative_eq!(
            plane.distance_to(&Point3::new(3.0, 4.0, -2.0)),
            2.0,
            epsilon = 1e-12
        );
    }
}
