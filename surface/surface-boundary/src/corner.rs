//! Canonical node corners and the corner-to-face map.

use crate::{Boundary, FaceId};
use carve_octree::{NodeId, Octree};
use carve_types::{corner_position, face_corners, Point3, NUM_CORNERS_PER_FACE};
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

/// A canonical octree corner.
///
/// Corners of adjacent leaves at matching positions must collapse to
/// one logical corner, so a corner is identified by its discretized
/// position on the half-resolution lattice anchored at the root
/// center. Any `(node, corner-index)` pair resolving to the same
/// lattice point is the same corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Corner {
    x: i32,
    y: i32,
    z: i32,
}

impl Corner {
    /// The corner at index `ci` (0..8) of a node.
    #[must_use]
    pub fn of_node(tree: &Octree, node: NodeId, ci: usize) -> Self {
        let n = tree.node(node);
        Self::of_position(tree, &corner_position(&n.center, n.halfwidth, ci))
    }

    /// The corner at index `fi` (0..4) of a boundary face.
    ///
    /// The smaller of the face's two nodes carries the face geometry,
    /// so its corners define the face's logical corners.
    #[must_use]
    pub fn of_face(tree: &Octree, boundary: &Boundary, face: FaceId, fi: usize) -> Self {
        let f = boundary.face(face);
        let interior_hw = tree.node(f.interior).halfwidth;
        let (node, cube_face) = match f.exterior {
            Some(e) if tree.node(e).halfwidth < interior_hw => (e, f.direction.opposite()),
            _ => (f.interior, f.direction),
        };
        Self::of_node(tree, node, face_corners(cube_face)[fi])
    }

    /// Discretizes a world position onto the corner lattice.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of_position(tree: &Octree, p: &Point3<f64>) -> Self {
        let origin = tree.node(tree.root()).center;
        let step = tree.resolution() * 0.5;
        let rel = p - origin;
        Self {
            x: (rel.x / step).round() as i32,
            y: (rel.y / step).round() as i32,
            z: (rel.z / step).round() as i32,
        }
    }

    /// World position of the lattice point.
    #[must_use]
    pub fn position(&self, tree: &Octree) -> Point3<f64> {
        let origin = tree.node(tree.root()).center;
        let step = tree.resolution() * 0.5;
        Point3::new(
            f64::from(self.x).mul_add(step, origin.x),
            f64::from(self.y).mul_add(step, origin.y),
            f64::from(self.z).mul_add(step, origin.z),
        )
    }
}

#[derive(Debug, Clone, Default)]
struct CornerInfo {
    faces: SmallVec<[FaceId; 8]>,
    edges: SmallVec<[Corner; 6]>,
}

/// Maps logical corners to their incident boundary faces and, after
/// [`CornerMap::populate_edges`], to the corners they share a
/// boundary-face edge with.
///
/// This is the dual structure the mesher walks: a corner incident on
/// faces of two or more planar regions becomes an output vertex.
#[derive(Debug, Clone, Default)]
pub struct CornerMap {
    map: HashMap<Corner, CornerInfo>,
}

impl CornerMap {
    /// Collects the four corners of every boundary face.
    #[must_use]
    pub fn build(tree: &Octree, boundary: &Boundary) -> Self {
        let mut cm = Self::default();
        cm.add(tree, boundary);
        cm
    }

    /// Adds all corners of a boundary into the map. Corners already
    /// present accumulate the new incident faces.
    pub fn add(&mut self, tree: &Octree, boundary: &Boundary) {
        for id in boundary.ids() {
            for fi in 0..NUM_CORNERS_PER_FACE {
                let corner = Corner::of_face(tree, boundary, id, fi);
                let info = self.map.entry(corner).or_default();
                if !info.faces.contains(&id) {
                    info.faces.push(id);
                }
            }
        }
        debug!(corners = self.map.len(), "corner map populated");
    }

    /// Links corners that share a boundary-face edge.
    ///
    /// Each face contributes its four perimeter edges; the relation is
    /// stored symmetrically.
    pub fn populate_edges(&mut self, tree: &Octree, boundary: &Boundary) {
        for id in boundary.ids() {
            let mut corners = [None; NUM_CORNERS_PER_FACE];
            for (fi, slot) in corners.iter_mut().enumerate() {
                *slot = Some(Corner::of_face(tree, boundary, id, fi));
            }
            for fi in 0..NUM_CORNERS_PER_FACE {
                let (Some(a), Some(b)) = (corners[fi], corners[(fi + 1) % NUM_CORNERS_PER_FACE])
                else {
                    continue;
                };
                self.link(a, b);
                self.link(b, a);
            }
        }
    }

    fn link(&mut self, from: Corner, to: Corner) {
        let info = self.map.entry(from).or_default();
        if !info.edges.contains(&to) {
            info.edges.push(to);
        }
    }

    /// Number of distinct corners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when no corner has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all corners.
    pub fn corners(&self) -> impl Iterator<Item = Corner> + '_ {
        self.map.keys().copied()
    }

    /// Boundary faces incident on a corner. Empty for unknown corners.
    #[must_use]
    pub fn faces_for(&self, corner: Corner) -> &[FaceId] {
        self.map.get(&corner).map_or(&[], |i| i.faces.as_slice())
    }

    /// Corners sharing a boundary-face edge with this corner.
    #[must_use]
    pub fn edges_for(&self, corner: Corner) -> &[Corner] {
        self.map.get(&corner).map_or(&[], |i| i.edges.as_slice())
    }

    /// Inverse-distance-weighted occupancy probability at a corner,
    /// interpolated from the nodes of its incident faces.
    ///
    /// Returns 0.5 when the corner is unknown or none of its nodes
    /// carry data.
    #[must_use]
    pub fn interpolated_probability(
        &self,
        tree: &Octree,
        boundary: &Boundary,
        corner: Corner,
    ) -> f64 {
        let pos = corner.position(tree);
        let mut nodes: SmallVec<[NodeId; 16]> = SmallVec::new();
        for &fid in self.faces_for(corner) {
            let f = boundary.face(fid);
            if !nodes.contains(&f.interior) {
                nodes.push(f.interior);
            }
            if let Some(e) = f.exterior {
                if !nodes.contains(&e) {
                    nodes.push(e);
                }
            }
        }

        let mut num = 0.0;
        let mut den = 0.0;
        for id in nodes {
            let Some(data) = tree.leaf_data(id) else {
                continue;
            };
            let dist = (pos - tree.node(id).center).norm();
            if dist <= f64::EPSILON {
                return data.probability();
            }
            let w = 1.0 / dist;
            num += w * data.probability();
            den += w;
        }
        if den <= 0.0 {
            0.5
        } else {
            num / den
        }
    }
}
