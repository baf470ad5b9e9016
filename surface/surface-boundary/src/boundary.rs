//! Boundary extraction and face linkage.

use crate::{BoundaryFace, FaceId, SegScheme};
use carve_octree::{NodeId, Octree};
use carve_types::CubeFace;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use surface_topology::Topology;
use tracing::debug;

/// The oriented boundary of a segmentation: every face between an
/// interior leaf and non-interior space, plus face-to-face adjacency.
///
/// Faces are stored densely and addressed by [`FaceId`]; the node
/// index maps every participating leaf (interior and exterior alike)
/// to the faces that abut it.
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    scheme: SegScheme,
    faces: Vec<BoundaryFace>,
    neighbors: Vec<SmallVec<[FaceId; 8]>>,
    index: HashMap<BoundaryFace, FaceId>,
    node_faces: HashMap<NodeId, SmallVec<[FaceId; 6]>>,
}

impl Boundary {
    /// Extracts the boundary of a tree under a segmentation scheme.
    ///
    /// A face is emitted for every (interior leaf, face, neighbor)
    /// where the neighbor is non-interior, and once with an absent
    /// exterior for every interior face that borders unbounded space.
    /// Neighboring faces that share an edge with compatible
    /// orientation are then linked.
    #[must_use]
    pub fn extract(tree: &Octree, topo: &Topology, scheme: SegScheme) -> Self {
        let mut boundary = Self {
            scheme,
            ..Self::default()
        };
        boundary.populate_faces(tree, topo);
        boundary.populate_linkages(tree, topo);
        debug!(faces = boundary.faces.len(), ?scheme, "boundary extracted");
        boundary
    }

    /// The scheme this boundary was extracted under.
    #[must_use]
    pub const fn scheme(&self) -> SegScheme {
        self.scheme
    }

    /// Number of boundary faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// `true` when no boundary was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// The face addressed by a handle.
    ///
    /// # Panics
    ///
    /// Panics when the handle does not belong to this boundary.
    #[inline]
    #[must_use]
    pub fn face(&self, id: FaceId) -> &BoundaryFace {
        &self.faces[id.index()]
    }

    /// Looks up the handle of a face tuple.
    #[must_use]
    pub fn id_of(&self, face: &BoundaryFace) -> Option<FaceId> {
        self.index.get(face).copied()
    }

    /// Iterates over all face handles in emission order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(|i| FaceId(i as u32))
    }

    /// Edge-sharing neighbor faces of a face.
    #[must_use]
    pub fn face_neighbors(&self, id: FaceId) -> &[FaceId] {
        &self.neighbors[id.index()]
    }

    /// Faces abutting a node (on either side).
    #[must_use]
    pub fn faces_of_node(&self, node: NodeId) -> &[FaceId] {
        self.node_faces.get(&node).map_or(&[], SmallVec::as_slice)
    }

    fn populate_faces(&mut self, tree: &Octree, topo: &Topology) {
        let mut nodes: Vec<NodeId> = topo.nodes().collect();
        nodes.sort_unstable();

        for node in nodes {
            if !self.scheme.is_interior(tree.leaf_data(node)) {
                continue;
            }
            for direction in CubeFace::ALL {
                let neighbors = topo.neighbors(node, direction);
                if neighbors.is_empty() {
                    // Bordering null space outside the tree: unbounded
                    // exterior.
                    self.push_face(BoundaryFace {
                        interior: node,
                        exterior: None,
                        direction,
                    });
                    continue;
                }
                for &neighbor in neighbors {
                    if self.scheme.is_interior(tree.leaf_data(neighbor)) {
                        continue;
                    }
                    self.push_face(BoundaryFace {
                        interior: node,
                        exterior: Some(neighbor),
                        direction,
                    });
                }
            }
        }
    }

    fn push_face(&mut self, face: BoundaryFace) {
        #[allow(clippy::cast_possible_truncation)]
        let id = FaceId(self.faces.len() as u32);
        self.faces.push(face);
        self.neighbors.push(SmallVec::new());
        self.index.insert(face, id);
        self.node_faces.entry(face.interior).or_default().push(id);
        if let Some(ext) = face.exterior {
            self.node_faces.entry(ext).or_default().push(id);
        }
    }

    /// Links every pair of neighboring faces that share an edge with
    /// compatible orientation.
    ///
    /// Candidates are limited to faces abutting the same nodes or the
    /// topological neighbors of those nodes; the decision then follows
    /// the edge-sharing rules of [`BoundaryFace::shares_edge_with`],
    /// with two shortcuts carried over from the node topology: faces
    /// sharing their interior node link when their exteriors are
    /// adjacent, and faces sharing their exterior node link when their
    /// interiors are adjacent.
    fn populate_linkages(&mut self, tree: &Octree, topo: &Topology) {
        for id in 0..self.faces.len() {
            #[allow(clippy::cast_possible_truncation)]
            let id = FaceId(id as u32);
            let face = self.faces[id.index()];

            let mut nearby: HashSet<FaceId> = HashSet::new();
            self.collect_nearby(topo, Some(face.interior), &mut nearby);
            self.collect_nearby(topo, face.exterior, &mut nearby);

            for other_id in nearby {
                if other_id == id {
                    continue;
                }
                let other = self.faces[other_id.index()];
                if self.should_link(&face, &other, tree, topo) {
                    let set = &mut self.neighbors[id.index()];
                    if !set.contains(&other_id) {
                        set.push(other_id);
                    }
                }
            }
        }
        // Keep neighbor lists deterministic regardless of hash order.
        for set in &mut self.neighbors {
            set.sort_unstable();
        }
    }

    fn should_link(
        &self,
        face: &BoundaryFace,
        other: &BoundaryFace,
        tree: &Octree,
        topo: &Topology,
    ) -> bool {
        let exteriors_adjacent = match (face.exterior, other.exterior) {
            (Some(a), Some(b)) => topo.are_neighbors(a, b),
            _ => false,
        };

        if face.interior == other.interior {
            return exteriors_adjacent || face.shares_edge_with(other, tree);
        }
        if face.exterior.is_some() && face.exterior == other.exterior {
            return topo.are_neighbors(face.interior, other.interior)
                || face.shares_edge_with(other, tree);
        }

        // Faces sharing neither node must be same-direction coplanar
        // squares on adjacent node pairs.
        if !topo.are_neighbors(face.interior, other.interior) {
            return false;
        }
        if face.direction != other.direction {
            return false;
        }
        let both_unbounded = face.exterior.is_none() && other.exterior.is_none();
        if !exteriors_adjacent && !both_unbounded {
            return false;
        }
        let axis = face.direction.axis();
        (face.center(tree)[axis] - other.center(tree)[axis]).abs() <= 1e-9
    }

    fn collect_nearby(&self, topo: &Topology, node: Option<NodeId>, out: &mut HashSet<FaceId>) {
        let Some(node) = node else {
            return;
        };
        out.extend(self.faces_of_node(node).iter().copied());
        if let Some(record) = topo.record(node) {
            for (_, neighbor) in record.iter_all() {
                out.extend(self.faces_of_node(neighbor).iter().copied());
            }
        }
    }
}
