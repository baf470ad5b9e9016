//! The closed shape union.

use crate::{CarveWedge, ExtrudedPolygon, PlaneSeed, RayCarve, SolidBox};
use carve_octree::{BoxRelation, CarveShape, LeafData};
use carve_types::Aabb;
use nalgebra::Point3;

/// The closed set of shapes the pipeline can carve.
///
/// The insertion walk is polymorphic over a small capability set
/// ([`CarveShape`]); the set of implementors is known and fixed, so
/// dispatch is a tagged union rather than a trait object.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// A weighted scan ray.
    Ray(RayCarve),
    /// The envelope between two consecutive-frame rays.
    Wedge(CarveWedge),
    /// A floorplan room prism.
    Room(ExtrudedPolygon),
    /// An axis-aligned solid stamp.
    Box(SolidBox),
    /// A bounded plane patch stamp.
    Plane(PlaneSeed),
}

impl CarveShape for ShapeKind {
    fn aabb(&self) -> Aabb {
        match self {
            Self::Ray(s) => s.aabb(),
            Self::Wedge(s) => s.aabb(),
            Self::Room(s) => s.aabb(),
            Self::Box(s) => s.aabb(),
            Self::Plane(s) => s.aabb(),
        }
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        match self {
            Self::Ray(s) => s.classify(center, halfwidth),
            Self::Wedge(s) => s.classify(center, halfwidth),
            Self::Room(s) => s.classify(center, halfwidth),
            Self::Box(s) => s.classify(center, halfwidth),
            Self::Plane(s) => s.classify(center, halfwidth),
        }
    }

    fn apply_to_leaf(&self, data: &mut LeafData, center: &Point3<f64>, halfwidth: f64) {
        match self {
            Self::Ray(s) => s.apply_to_leaf(data, center, halfwidth),
            Self::Wedge(s) => s.apply_to_leaf(data, center, halfwidth),
            Self::Room(s) => s.apply_to_leaf(data, center, halfwidth),
            Self::Box(s) => s.apply_to_leaf(data, center, halfwidth),
            Self::Plane(s) => s.apply_to_leaf(data, center, halfwidth),
        }
    }
}

impl From<RayCarve> for ShapeKind {
    fn from(s: RayCarve) -> Self {
        Self::Ray(s)
    }
}

impl From<CarveWedge> for ShapeKind {
    fn from(s: CarveWedge) -> Self {
        Self::Wedge(s)
    }
}

impl From<ExtrudedPolygon> for ShapeKind {
    fn from(s: ExtrudedPolygon) -> Self {
        Self::Room(s)
    }
}

impl From<SolidBox> for ShapeKind {
    fn from(s: SolidBox) -> Self {
        Self::Box(s)
    }
}

impl From<PlaneSeed> for ShapeKind {
    fn from(s: PlaneSeed) -> Self {
        Self::Plane(s)
    }
}
