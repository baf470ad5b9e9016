//! Axis-aligned bounding boxes.

use nalgebra::Point3;

/// An axis-aligned bounding box in world coordinates.
///
/// Shapes report a conservative `Aabb` so the octree can grow its
/// domain before insertion and prune disjoint subtrees during the
/// insertion walk.
///
/// # Example
///
/// ```
/// use carve_types::Aabb;
/// use nalgebra::Point3;
///
/// let b = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
/// assert!(b.contains_point(&Point3::new(1.0, 0.5, 0.5)));
/// assert!(!b.is_degenerate());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Creates a bounding box from two corners, normalizing the order
    /// of the coordinates.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Creates a cube-shaped bounding box from a center and halfwidth.
    #[must_use]
    pub fn from_center_halfwidth(center: &Point3<f64>, halfwidth: f64) -> Self {
        let h = nalgebra::Vector3::repeat(halfwidth);
        Self {
            min: center - h,
            max: center + h,
        }
    }

    /// Expands this box to include another box.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Checks whether a point lies inside the box (boundary inclusive).
    #[must_use]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Checks whether this box fully contains another box.
    #[must_use]
    pub fn contains_box(&self, other: &Self) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Checks whether two boxes overlap (boundary touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Checks whether the box is degenerate.
    ///
    /// A box is degenerate when any coordinate is non-finite or when it
    /// has collapsed to a single point. A zero extent along one or two
    /// axes is fine (line segments and flat patches have those), but a
    /// box with no diameter at all carries no carving information and
    /// is rejected at the insertion boundary.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let finite = self.min.iter().chain(self.max.iter()).all(|v| v.is_finite());
        if !finite {
            return true;
        }
        if self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z {
            return true;
        }
        self.min == self.max
    }

    /// Returns the center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_corners() {
        let b = Aabb::new(Point3::new(1.0, 0.0, 5.0), Point3::new(0.0, 2.0, 4.0));
        assert_eq!(b.min, Point3::new(0.0, 0.0, 4.0));
        assert_eq!(b.max, Point3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(2.0, -1.0, 0.0), Point3::new(3.0, 0.0, 1.0));
        let u = a.union(&b);
        assert!(u.contains_box(&a));
        assert!(u.contains_box(&b));
    }

    #[test]
    fn intersects_touching_boxes() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));

        let c = Aabb::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn line_segment_box_is_not_degenerate() {
        // Zero thickness along two axes is still a usable shape bound.
        let b = Aabb::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        assert!(!b.is_degenerate());
    }

    #[test]
    fn point_and_nan_boxes_are_degenerate() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(Aabb::new(p, p).is_degenerate());

        let b = Aabb::new(Point3::new(f64::NAN, 0.0, 0.0), Point3::origin());
        assert!(b.is_degenerate());
    }
}
