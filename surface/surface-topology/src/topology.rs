//! Topology construction and verification.

use carve_octree::{NodeId, Octree};
use carve_types::{octant_offset, CarveError, CubeFace, Result, CHILDREN_PER_NODE};
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Tolerance for the neighbor-geometry consistency checks.
const APPROX_ZERO: f64 = 1e-9;

/// Six face-keyed neighbor sets for one node.
///
/// Entries are deduplicated; a set holds more than one handle only
/// when the neighboring side is subdivided more finely than this node.
#[derive(Debug, Clone, Default)]
pub struct NeighborRecord {
    sets: [SmallVec<[NodeId; 4]>; 6],
}

impl NeighborRecord {
    /// Neighbors on the given face.
    #[must_use]
    pub fn get(&self, face: CubeFace) -> &[NodeId] {
        &self.sets[face.index()]
    }

    /// All neighbors across all six faces, in face order.
    pub fn iter_all(&self) -> impl Iterator<Item = (CubeFace, NodeId)> + '_ {
        CubeFace::ALL
            .into_iter()
            .flat_map(move |f| self.sets[f.index()].iter().map(move |&n| (f, n)))
    }

    fn add(&mut self, node: NodeId, face: CubeFace) {
        let set = &mut self.sets[face.index()];
        if !set.contains(&node) {
            set.push(node);
        }
    }

    fn remove(&mut self, node: NodeId, face: CubeFace) {
        self.sets[face.index()].retain(|n| *n != node);
    }

    /// Per-face neighbor when the face set is a singleton, else `None`.
    fn singletons(&self) -> [Option<NodeId>; 6] {
        let mut out = [None; 6];
        for f in CubeFace::ALL {
            let set = &self.sets[f.index()];
            if set.len() == 1 {
                out[f.index()] = Some(set[0]);
            }
        }
        out
    }
}

/// Leaf-to-leaf face adjacency for a whole tree.
///
/// Built once after carving completes; holds only [`NodeId`] handles,
/// so it stays valid as long as the tree structure is not mutated.
/// Payload mutation (including outlier flipping) does not invalidate
/// it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    map: HashMap<NodeId, NeighborRecord>,
}

impl Topology {
    /// Derives the leaf adjacency of a tree.
    ///
    /// The construction walks the tree top-down. Each child inherits
    /// candidate neighbors from its siblings (fixed table over the
    /// octant ordering) and from the children of its parent's
    /// same-face neighbor, or that neighbor itself where the
    /// neighboring side is coarser. A post-pass erases non-leaf
    /// entries and rewrites their references so that every recorded
    /// neighbor is a leaf and every adjacency is symmetric.
    #[must_use]
    pub fn build(tree: &Octree) -> Self {
        let mut topo = Self::default();
        // The root has no peers at its own level.
        topo.map.insert(tree.root(), NeighborRecord::default());
        topo.init_children(tree, tree.root());
        topo.resolve_leaves(tree);
        debug!(leaves = topo.map.len(), "topology built");
        topo
    }

    /// Number of nodes with adjacency records (the leaves).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when no adjacency has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all recorded nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map.keys().copied()
    }

    /// Neighbor record of a node, if it is in the topology.
    #[must_use]
    pub fn record(&self, node: NodeId) -> Option<&NeighborRecord> {
        self.map.get(&node)
    }

    /// Neighbors of a node on one face. Empty for unknown nodes.
    #[must_use]
    pub fn neighbors(&self, node: NodeId, face: CubeFace) -> &[NodeId] {
        self.map.get(&node).map_or(&[], |rec| rec.get(face))
    }

    /// Checks whether two nodes are recorded as face-adjacent.
    ///
    /// A one-sided record is a contract violation; it is reported but
    /// still counted as adjacency, matching the permissive behavior of
    /// the verification-time check.
    #[must_use]
    pub fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let (Some(ra), Some(rb)) = (self.map.get(&a), self.map.get(&b)) else {
            return false;
        };
        for f in CubeFace::ALL {
            if ra.get(f).contains(&b) {
                if !rb.get(f.opposite()).contains(&a) {
                    warn!(?a, ?b, face = ?f, "asymmetric neighbor records");
                }
                return true;
            }
        }
        false
    }

    /// Verifies the topology contract against the tree.
    ///
    /// Checks that every recorded node and neighbor is a leaf, that no
    /// node neighbors itself, that the relation is symmetric on
    /// opposing faces, and that every neighboring pair geometrically
    /// touches: the center distance along the split axis must equal
    /// the halfwidth sum.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InconsistentTopology`] describing the
    /// first violation found.
    pub fn verify(&self, tree: &Octree) -> Result<()> {
        if self.map.is_empty() {
            warn!("verifying an empty topology");
        }
        for (&node, rec) in &self.map {
            if !tree.is_leaf(node) {
                return Err(CarveError::inconsistent_topology(format!(
                    "non-leaf node {node:?} present in final topology"
                )));
            }
            for f in CubeFace::ALL {
                let opp = f.opposite();
                for &neigh in rec.get(f) {
                    if neigh == node {
                        return Err(CarveError::inconsistent_topology(format!(
                            "{node:?} neighbors itself on {f:?}"
                        )));
                    }
                    let Some(nrec) = self.map.get(&neigh) else {
                        return Err(CarveError::inconsistent_topology(format!(
                            "{node:?} references {neigh:?} which has no record"
                        )));
                    };
                    if !tree.is_leaf(neigh) {
                        return Err(CarveError::inconsistent_topology(format!(
                            "{node:?} references non-leaf {neigh:?} on {f:?}"
                        )));
                    }
                    if !nrec.get(opp).contains(&node) {
                        return Err(CarveError::inconsistent_topology(format!(
                            "asymmetric records: {node:?} -> {neigh:?} on {f:?}"
                        )));
                    }

                    let a = tree.node(node);
                    let b = tree.node(neigh);
                    let axis = f.axis();
                    let dist = (a.center[axis] - b.center[axis]).abs();
                    let width_sum = a.halfwidth + b.halfwidth;
                    if (dist - width_sum).abs() > APPROX_ZERO {
                        return Err(CarveError::inconsistent_topology(format!(
                            "{node:?} and {neigh:?} recorded as touching on {f:?} \
                             but axis distance {dist} != halfwidth sum {width_sum}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn init_children(&mut self, tree: &Octree, node: NodeId) {
        if tree.is_leaf(node) {
            return;
        }
        let uncles = self
            .map
            .get(&node)
            .map(NeighborRecord::singletons)
            .unwrap_or_default();
        let children = tree.node(node).children;

        let mut recs: [NeighborRecord; CHILDREN_PER_NODE] = Default::default();

        // Internal linkages between siblings: across each axis, octant
        // i touches the octant with that axis flipped.
        for (i, rec) in recs.iter_mut().enumerate() {
            for axis in 0..3 {
                let j = flip_octant(i, axis);
                if let Some(sib) = children[j] {
                    rec.add(sib, face_toward(i, axis));
                }
            }
        }

        // External linkages to the children of the parent's same-face
        // neighbor (or to that neighbor itself where it is a leaf).
        for f in CubeFace::ALL {
            let axis = f.axis();
            let Some(uncle) = uncles[f.index()] else {
                continue;
            };
            let uncle_is_leaf = tree.is_leaf(uncle);
            for (i, rec) in recs.iter_mut().enumerate() {
                if octant_side(i, axis) != f.sign() {
                    continue;
                }
                let target = if uncle_is_leaf {
                    Some(uncle)
                } else {
                    tree.node(uncle).children[flip_octant(i, axis)]
                };
                if let Some(t) = target {
                    rec.add(t, f);
                }
            }
        }

        for (i, rec) in recs.iter_mut().enumerate() {
            if let Some(child) = children[i] {
                self.map.insert(child, std::mem::take(rec));
                self.init_children(tree, child);
            }
        }
    }

    /// Erases non-leaf entries and rewires their references so only
    /// leaf-to-leaf adjacency remains, symmetric on opposing faces.
    fn resolve_leaves(&mut self, tree: &Octree) {
        let mut keys: Vec<NodeId> = self.map.keys().copied().collect();
        keys.sort_unstable();

        let mut to_remove = Vec::new();
        for node in keys {
            let is_leaf = tree.is_leaf(node);
            if !is_leaf {
                to_remove.push(node);
            }
            let Some(rec) = self.map.get(&node).cloned() else {
                continue;
            };
            for f in CubeFace::ALL {
                let opp = f.opposite();
                for &neigh in rec.get(f) {
                    if let Some(nrec) = self.map.get_mut(&neigh) {
                        if is_leaf {
                            // A fine leaf announces itself to coarser
                            // neighbors that cannot see it from their
                            // own level.
                            nrec.add(node, opp);
                        } else {
                            nrec.remove(node, opp);
                        }
                    }
                }
            }
        }
        for node in to_remove {
            self.map.remove(&node);
        }
    }
}

/// The octant with the given axis flipped.
fn flip_octant(octant: usize, axis: usize) -> usize {
    let off = octant_offset(octant);
    let mut signs = [off.x > 0.0, off.y > 0.0, off.z > 0.0];
    signs[axis] = !signs[axis];
    carve_types::octant_index(signs[0], signs[1], signs[2])
}

/// Which side of the parent (+1 or -1) octant `i` sits on along `axis`.
fn octant_side(octant: usize, axis: usize) -> f64 {
    octant_offset(octant)[axis]
}

/// The face of octant `i` that points toward its across-`axis` sibling.
fn face_toward(octant: usize, axis: usize) -> CubeFace {
    let positive = octant_offset(octant)[axis] < 0.0;
    match (axis, positive) {
        (0, true) => CubeFace::XPlus,
        (0, false) => CubeFace::XMinus,
        (1, true) => CubeFace::YPlus,
        (1, false) => CubeFace::YMinus,
        (2, true) => CubeFace::ZPlus,
        _ => CubeFace::ZMinus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    /// Two adjacent equal-size leaves sharing the +x face of the first.
    fn two_leaf_tree() -> (Octree, NodeId, NodeId) {
        let mut tree = Octree::with_domain(Point3::origin(), 1.0, 1.0).unwrap();
        let a = tree.insert_point(&Point3::new(-0.5, 0.5, 0.5)).unwrap();
        let b = tree.insert_point(&Point3::new(0.5, 0.5, 0.5)).unwrap();
        (tree, a, b)
    }

    #[test]
    fn two_leaf_symmetry() {
        let (tree, a, b) = two_leaf_tree();
        let topo = Topology::build(&tree);

        assert_eq!(topo.neighbors(a, CubeFace::XPlus), &[b]);
        assert_eq!(topo.neighbors(b, CubeFace::XMinus), &[a]);
        assert!(topo.are_neighbors(a, b));
        assert!(topo.are_neighbors(b, a));
        topo.verify(&tree).unwrap();
    }

    #[test]
    fn root_only_tree_has_single_record() {
        let tree = Octree::new(1.0);
        let topo = Topology::build(&tree);
        assert_eq!(topo.len(), 1);
        topo.verify(&tree).unwrap();
    }

    #[test]
    fn full_grid_neighbor_counts() {
        // A fully subdivided 4x4x4 grid: interior leaves have 6
        // neighbors, corner leaves 3.
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    let p = Point3::new(
                        -1.5 + f64::from(x),
                        -1.5 + f64::from(y),
                        -1.5 + f64::from(z),
                    );
                    tree.insert_point(&p).unwrap();
                }
            }
        }
        let topo = Topology::build(&tree);
        topo.verify(&tree).unwrap();

        let interior = tree.leaf_at(&Point3::new(0.5, 0.5, 0.5)).unwrap();
        let n: usize = CubeFace::ALL
            .iter()
            .map(|&f| topo.neighbors(interior, f).len())
            .sum();
        assert_eq!(n, 6);

        let corner = tree.leaf_at(&Point3::new(-1.5, -1.5, -1.5)).unwrap();
        let n: usize = CubeFace::ALL
            .iter()
            .map(|&f| topo.neighbors(corner, f).len())
            .sum();
        assert_eq!(n, 3);
    }

    #[test]
    fn cross_level_adjacency_is_symmetric() {
        // Refine one octant to max depth and leave its neighbor
        // coarse; the coarse leaf must see all four fine leaves on the
        // shared face and each fine leaf must see the coarse one.
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        // Coarse level first, then refine only the -x side near the
        // internal boundary.
        tree.subdivide(tree.root());
        for y in [-0.5, 0.5] {
            for z in [-0.5, 0.5] {
                tree.insert_point(&Point3::new(-0.5, y, z)).unwrap();
            }
        }
        let topo = Topology::build(&tree);
        topo.verify(&tree).unwrap();

        // The +x sibling of the refined octant stayed a coarse leaf.
        let coarse = tree.leaf_at(&Point3::new(1.0, 1.0, 1.0)).unwrap();
        assert!(tree.node(coarse).halfwidth > 0.5);

        let fine = tree.leaf_at(&Point3::new(-0.5, 0.5, 0.5)).unwrap();
        assert!(topo.neighbors(fine, CubeFace::XPlus).contains(&coarse));
        assert!(topo.neighbors(coarse, CubeFace::XMinus).contains(&fine));
        assert!(topo.are_neighbors(fine, coarse));
    }

    #[test]
    fn flip_octant_table() {
        assert_eq!(flip_octant(0, 0), 1);
        assert_eq!(flip_octant(0, 1), 3);
        assert_eq!(flip_octant(0, 2), 4);
        assert_eq!(flip_octant(6, 0), 7);
        assert_eq!(flip_octant(6, 1), 5);
        assert_eq!(flip_octant(6, 2), 2);
    }
}
