//! Floorplan room prisms.

use carve_octree::{BoxRelation, CarveShape, LeafData};
use carve_types::{Aabb, CarveError, Result};
use nalgebra::Point3;

/// A floorplan room extruded between floor and ceiling elevations.
///
/// The footprint is a simple 2D polygon in the xy-plane; intersected
/// leaves are tagged with the room index (occupancy statistics are not
/// touched). With `hollow` set, only boxes straddling the prism
/// boundary are visited, which refines and tags the room shell without
/// filling the interior; without it, fully-inside boxes are tagged at
/// their current depth as well.
#[derive(Debug, Clone)]
pub struct ExtrudedPolygon {
    verts: Vec<[f64; 2]>,
    floor_z: f64,
    ceiling_z: f64,
    room_index: i32,
    hollow: bool,
    bounds: Aabb,
}

impl ExtrudedPolygon {
    /// Builds a room prism from a simple polygon footprint.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for fewer than three
    /// vertices, non-finite coordinates, a negative room index, or
    /// `floor_z >= ceiling_z`.
    pub fn new(
        verts: Vec<[f64; 2]>,
        floor_z: f64,
        ceiling_z: f64,
        room_index: i32,
        hollow: bool,
    ) -> Result<Self> {
        if verts.len() < 3 {
            return Err(CarveError::invalid_input(format!(
                "room footprint needs at least 3 vertices, got {}",
                verts.len()
            )));
        }
        if verts.iter().flatten().any(|v| !v.is_finite())
            || !floor_z.is_finite()
            || !ceiling_z.is_finite()
        {
            return Err(CarveError::invalid_input(
                "room geometry must be finite",
            ));
        }
        if floor_z >= ceiling_z {
            return Err(CarveError::invalid_input(format!(
                "room floor ({floor_z}) must be below ceiling ({ceiling_z})"
            )));
        }
        if room_index < 0 {
            return Err(CarveError::invalid_input(format!(
                "room index must be non-negative, got {room_index}"
            )));
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &verts {
            min_x = min_x.min(v[0]);
            min_y = min_y.min(v[1]);
            max_x = max_x.max(v[0]);
            max_y = max_y.max(v[1]);
        }
        let bounds = Aabb::new(
            Point3::new(min_x, min_y, floor_z),
            Point3::new(max_x, max_y, ceiling_z),
        );

        Ok(Self {
            verts,
            floor_z,
            ceiling_z,
            room_index,
            hollow,
            bounds,
        })
    }

    /// The room index stamped onto intersected leaves.
    #[must_use]
    pub const fn room_index(&self) -> i32 {
        self.room_index
    }

    /// Even-odd point-in-polygon test on the footprint.
    #[must_use]
    pub fn footprint_contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        let n = self.verts.len();
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.verts[i][0], self.verts[i][1]);
            let (xj, yj) = (self.verts[j][0], self.verts[j][1]);
            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// True when any footprint edge crosses the xy rectangle.
    fn edge_crosses_rect(&self, lo: [f64; 2], hi: [f64; 2]) -> bool {
        let n = self.verts.len();
        let mut j = n - 1;
        for i in 0..n {
            if segment_intersects_rect(self.verts[j], self.verts[i], lo, hi) {
                return true;
            }
            j = i;
        }
        false
    }
}

impl CarveShape for ExtrudedPolygon {
    fn aabb(&self) -> Aabb {
        self.bounds
    }

    fn classify(&self, center: &Point3<f64>, halfwidth: f64) -> BoxRelation {
        // The z-slab decides first.
        let z_lo = center.z - halfwidth;
        let z_hi = center.z + halfwidth;
        if z_lo > self.ceiling_z || z_hi < self.floor_z {
            return BoxRelation::Disjoint;
        }

        let lo = [center.x - halfwidth, center.y - halfwidth];
        let hi = [center.x + halfwidth, center.y + halfwidth];

        // Any footprint vertex in the box, or any footprint edge
        // crossing it, puts the box on the room boundary.
        let vertex_in_box = self.verts.iter().any(|v| {
            v[0] >= lo[0] && v[0] <= hi[0] && v[1] >= lo[1] && v[1] <= hi[1]
        });
        if vertex_in_box || self.edge_crosses_rect(lo, hi) {
            return BoxRelation::Straddles;
        }

        // No boundary crossing: the box is uniformly inside or outside
        // the footprint; its center decides which.
        if !self.footprint_contains(center.x, center.y) {
            return BoxRelation::Disjoint;
        }

        // Inside the footprint; check the vertical extent.
        let fully_in_slab = z_lo >= self.floor_z && z_hi <= self.ceiling_z;
        if !fully_in_slab {
            return BoxRelation::Straddles;
        }
        if self.hollow {
            // Shell-only import skips the filled interior.
            BoxRelation::Disjoint
        } else {
            BoxRelation::Inside
        }
    }

    fn apply_to_leaf(&self, data: &mut LeafData, _center: &Point3<f64>, _halfwidth: f64) {
        data.set_fp_room(self.room_index);
    }
}

/// Segment/rectangle overlap in 2D.
fn segment_intersects_rect(a: [f64; 2], b: [f64; 2], lo: [f64; 2], hi: [f64; 2]) -> bool {
    // Quick reject on the segment's bounding box.
    if a[0].max(b[0]) < lo[0]
        || a[0].min(b[0]) > hi[0]
        || a[1].max(b[1]) < lo[1]
        || a[1].min(b[1]) > hi[1]
    {
        return false;
    }
    // Either endpoint inside.
    for p in [a, b] {
        if p[0] >= lo[0] && p[0] <= hi[0] && p[1] >= lo[1] && p[1] <= hi[1] {
            return true;
        }
    }
    // Otherwise the segment must cross one of the four rectangle edges.
    let corners = [
        [lo[0], lo[1]],
        [hi[0], lo[1]],
        [hi[0], hi[1]],
        [lo[0], hi[1]],
    ];
    for i in 0..4 {
        if segments_intersect(a, b, corners[i], corners[(i + 1) % 4]) {
            return true;
        }
    }
    false
}

fn segments_intersect(p1: [f64; 2], p2: [f64; 2], p3: [f64; 2], p4: [f64; 2]) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1.abs() < f64::EPSILON && on_segment(p3, p4, p1))
        || (d2.abs() < f64::EPSILON && on_segment(p3, p4, p2))
        || (d3.abs() < f64::EPSILON && on_segment(p1, p2, p3))
        || (d4.abs() < f64::EPSILON && on_segment(p1, p2, p4))
}

fn cross(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn on_segment(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> bool {
    p[0] >= a[0].min(b[0])
        && p[0] <= a[0].max(b[0])
        && p[1] >= a[1].min(b[1])
        && p[1] <= a[1].max(b[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_room(hollow: bool) -> ExtrudedPolygon {
        ExtrudedPolygon::new(
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            0.0,
            3.0,
            2,
            hollow,
        )
        .unwrap()
    }

    #[test]
    fn validation() {
        assert!(ExtrudedPolygon::new(vec![[0.0, 0.0]], 0.0, 1.0, 0, false).is_err());
        assert!(ExtrudedPolygon::new(
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            2.0,
            1.0,
            0,
            false
        )
        .is_err());
        assert!(ExtrudedPolygon::new(
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            0.0,
            1.0,
            -2,
            false
        )
        .is_err());
    }

    #[test]
    fn footprint_test() {
        let room = square_room(false);
        assert!(room.footprint_contains(5.0, 5.0));
        assert!(!room.footprint_contains(-1.0, 5.0));
        assert!(!room.footprint_contains(5.0, 11.0));
    }

    #[test]
    fn classify_interior_boundary_exterior() {
        let room = square_room(false);
        assert_eq!(
            room.classify(&Point3::new(5.0, 5.0, 1.5), 0.5),
            BoxRelation::Inside
        );
        assert_eq!(
            room.classify(&Point3::new(10.0, 5.0, 1.5), 0.5),
            BoxRelation::Straddles
        );
        assert_eq!(
            room.classify(&Point3::new(15.0, 5.0, 1.5), 0.5),
            BoxRelation::Disjoint
        );
        // Above the ceiling.
        assert_eq!(
            room.classify(&Point3::new(5.0, 5.0, 5.0), 0.5),
            BoxRelation::Disjoint
        );
        // Crossing the floor plane inside the footprint.
        assert_eq!(
            room.classify(&Point3::new(5.0, 5.0, 0.0), 0.5),
            BoxRelation::Straddles
        );
    }

    #[test]
    fn hollow_import_skips_the_interior() {
        let room = square_room(true);
        assert_eq!(
            room.classify(&Point3::new(5.0, 5.0, 1.5), 0.5),
            BoxRelation::Disjoint
        );
        assert_eq!(
            room.classify(&Point3::new(10.0, 5.0, 1.5), 0.5),
            BoxRelation::Straddles
        );
    }

    #[test]
    fn apply_tags_the_room() {
        let room = square_room(false);
        let mut data = LeafData::new();
        room.apply_to_leaf(&mut data, &Point3::new(5.0, 5.0, 1.5), 0.5);
        assert_eq!(data.fp_room, 2);
        assert_eq!(data.count, 0, "room import must not add samples");
    }
}
