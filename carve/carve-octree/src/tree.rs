//! The adaptive octree store.

use crate::{BoxRelation, CarveShape, LeafData, Node, NodeId};
use carve_types::{
    octant_index, octant_offset, CancelToken, CarveError, CubeFace, Result, CHILDREN_PER_NODE,
};
use nalgebra::Point3;
use tracing::debug;

/// Maximum relative depth between the root and the finest leaves.
///
/// Growth re-roots the tree and increments the relative depth, so this
/// also caps how far the domain can expand around a fixed resolution.
pub const MAX_TREE_DEPTH: u32 = 31;

/// An adaptive 8-way spatial index with per-leaf probabilistic data.
///
/// Nodes are stored in an arena and addressed by stable [`NodeId`]
/// handles. The tree owns a target leaf resolution: at any depth the
/// leaf voxel halfwidth is `root_halfwidth / 2^depth`, and insertion
/// never refines below `root_halfwidth / 2^max_depth <= resolution/2`.
///
/// The domain grows on demand: inserting geometry outside the root
/// cube wraps the root in progressively larger parents until the
/// geometry fits, preserving all existing data.
///
/// # Example
///
/// ```
/// use carve_octree::Octree;
/// use nalgebra::Point3;
///
/// let mut tree = Octree::new(0.5);
/// let leaf = tree.insert_point(&Point3::new(3.2, 0.1, -1.0)).unwrap();
/// assert!(tree.node(leaf).is_leaf());
/// assert!(tree.node(leaf).halfwidth <= 0.25 + 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<Node>,
    root: NodeId,
    max_depth: u32,
    /// Set once the root position is meaningful. A freshly created
    /// single-voxel tree floats until the first domain operation
    /// re-centers it on the data.
    pinned: bool,
}

impl Octree {
    /// Creates a tree whose root is a single voxel of the given
    /// resolution, centered at the origin.
    ///
    /// A non-positive or non-finite resolution is clamped to a tiny
    /// positive value; use [`Octree::try_new`] to reject it instead.
    #[must_use]
    pub fn new(resolution: f64) -> Self {
        let r = if resolution.is_finite() && resolution > 0.0 {
            resolution
        } else {
            f64::EPSILON
        };
        Self {
            nodes: vec![Node::new(Point3::origin(), r / 2.0)],
            root: NodeId(0),
            max_depth: 0,
            pinned: false,
        }
    }

    /// Creates a tree, rejecting an invalid resolution.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] if `resolution` is not
    /// positive and finite.
    pub fn try_new(resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        Ok(Self::new(resolution))
    }

    /// Creates a tree with an explicit root cube and target resolution.
    ///
    /// The depth is chosen so `2 * halfwidth / 2^depth` is as close as
    /// possible to `resolution`.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for non-positive halfwidth
    /// or resolution, and [`CarveError::DomainTooLarge`] when the
    /// requested ratio exceeds [`MAX_TREE_DEPTH`].
    pub fn with_domain(center: Point3<f64>, halfwidth: f64, resolution: f64) -> Result<Self> {
        if !halfwidth.is_finite() || halfwidth <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "halfwidth must be positive, got {halfwidth}"
            )));
        }
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let depth = ((2.0 * halfwidth / resolution).log2().round().max(0.0)) as u32;
        if depth > MAX_TREE_DEPTH {
            return Err(CarveError::DomainTooLarge {
                requested: depth,
                limit: MAX_TREE_DEPTH,
            });
        }
        Ok(Self {
            nodes: vec![Node::new(center, halfwidth)],
            root: NodeId(0),
            max_depth: depth,
            pinned: true,
        })
    }

    /// Resets the tree to a single unpinned voxel of the given
    /// resolution, discarding all nodes and data.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] if `resolution` is not
    /// positive and finite.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<()> {
        *self = Self::try_new(resolution)?;
        Ok(())
    }

    /// (Re-)constructs a tree from parsed parts. Used by persistence.
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId, max_depth: u32) -> Self {
        Self {
            nodes,
            root,
            max_depth,
            pinned: true,
        }
    }

    /// Handle of the root node.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Relative depth between the root and the finest allowed leaves.
    #[inline]
    #[must_use]
    pub const fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Target leaf resolution (finest voxel edge length).
    #[must_use]
    pub fn resolution(&self) -> f64 {
        2.0 * self.nodes[self.root.index()].halfwidth / f64::from(1u32 << self.max_depth)
    }

    /// Number of allocated nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the tree holds only an empty root voxel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[self.root.index()].data.is_none()
    }

    /// Borrows a node by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this tree.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// `true` when the node has no children.
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.index()].is_leaf()
    }

    /// Borrows the payload of a node, if it has one.
    #[must_use]
    pub fn leaf_data(&self, id: NodeId) -> Option<&LeafData> {
        self.nodes[id.index()].data.as_ref()
    }

    /// Mutably borrows the payload of a node, if it has one.
    pub fn leaf_data_mut(&mut self, id: NodeId) -> Option<&mut LeafData> {
        self.nodes[id.index()].data.as_mut()
    }

    /// Places a payload on a leaf, replacing any existing payload.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] if the node has children;
    /// only leaves may carry payloads.
    pub fn set_leaf_data(&mut self, id: NodeId, data: LeafData) -> Result<()> {
        if !self.nodes[id.index()].is_leaf() {
            return Err(CarveError::invalid_input(
                "payloads may only be placed on leaves",
            ));
        }
        self.nodes[id.index()].data = Some(data);
        Ok(())
    }

    /// Iterates over the handles of all leaves.
    #[allow(clippy::cast_possible_truncation)]
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Finds the deepest existing node containing a point.
    ///
    /// Returns `None` when the point lies outside the root cube.
    #[must_use]
    pub fn leaf_at(&self, p: &Point3<f64>) -> Option<NodeId> {
        let mut id = self.root;
        self.nodes[id.index()].octant_of(p)?;
        loop {
            let node = &self.nodes[id.index()];
            let Some(oct) = node.octant_of(p) else {
                return Some(id);
            };
            match node.children[oct] {
                Some(child) => id = child,
                None => return Some(id),
            }
        }
    }

    /// Grows the domain until the point lies inside the root cube.
    ///
    /// Each growth step wraps the current root inside a parent of
    /// double halfwidth, choosing the octant so the tree extends
    /// toward the point. Existing data is preserved. A trivial tree
    /// (a single empty voxel) is instead re-centered on the point.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::DomainTooLarge`] when growth would exceed
    /// [`MAX_TREE_DEPTH`].
    pub fn include_point(&mut self, p: &Point3<f64>) -> Result<()> {
        if !p.iter().all(|v| v.is_finite()) {
            return Err(CarveError::invalid_input(format!(
                "cannot grow domain to non-finite point {p:?}"
            )));
        }

        // A tree that has never seen data is cheaper to move than to
        // grow around.
        if !self.pinned && self.max_depth == 0 && self.is_empty() {
            self.nodes[self.root.index()].center = *p;
            self.pinned = true;
            return Ok(());
        }
        self.pinned = true;

        while self.nodes[self.root.index()].octant_of(p).is_none() {
            if self.max_depth + 1 > MAX_TREE_DEPTH {
                return Err(CarveError::DomainTooLarge {
                    requested: self.max_depth + 1,
                    limit: MAX_TREE_DEPTH,
                });
            }

            let (old_center, old_hw) = {
                let r = &self.nodes[self.root.index()];
                (r.center, r.halfwidth)
            };

            // The old root becomes the wrapper child on its own side of
            // the point, so the wrapper extends toward the point.
            let oct = octant_index(
                old_center.x >= p.x,
                old_center.y >= p.y,
                old_center.z >= p.z,
            );
            let wrapper_center = old_center - old_hw * octant_offset(oct);

            let mut wrapper = Node::new(wrapper_center, 2.0 * old_hw);
            wrapper.children[oct] = Some(self.root);
            #[allow(clippy::cast_possible_truncation)]
            let wrapper_id = NodeId(self.nodes.len() as u32);
            self.nodes.push(wrapper);
            self.root = wrapper_id;
            self.max_depth += 1;
        }
        Ok(())
    }

    /// Grows the domain to enclose an axis-aligned box, by including
    /// each of its six face centers.
    ///
    /// # Errors
    ///
    /// Propagates [`CarveError::DomainTooLarge`] from point growth.
    pub fn include_box(&mut self, center: &Point3<f64>, halfwidth: f64) -> Result<()> {
        for face in CubeFace::ALL {
            let p = center + halfwidth * face.normal();
            self.include_point(&p)?;
        }
        Ok(())
    }

    /// Grows the domain if needed, then refines down to the maximum
    /// depth at the point, returning the finest leaf containing it.
    ///
    /// # Errors
    ///
    /// Propagates domain-growth failures.
    pub fn insert_point(&mut self, p: &Point3<f64>) -> Result<NodeId> {
        self.include_point(p)?;
        let mut id = self.root;
        for _ in 0..self.max_depth {
            // Refining a payload-carrying leaf redistributes its data.
            if self.nodes[id.index()].is_leaf() && self.nodes[id.index()].data.is_some() {
                self.subdivide(id);
            }
            let Some(oct) = self.nodes[id.index()].octant_of(p) else {
                break;
            };
            id = match self.nodes[id.index()].children[oct] {
                Some(child) => child,
                None => self.create_child(id, oct),
            };
        }
        Ok(id)
    }

    /// Inserts a shape, refining the tree and updating leaf payloads.
    ///
    /// The walk prunes disjoint subtrees, applies fully-inside boxes at
    /// their current depth, and subdivides straddling boxes until the
    /// maximum depth. Returns the handles of every leaf the shape was
    /// applied to.
    ///
    /// # Errors
    ///
    /// - [`CarveError::InvalidInput`] for a degenerate shape bound.
    /// - [`CarveError::DomainTooLarge`] if growth fails.
    /// - [`CarveError::Cancelled`] if the token fires; the tree is
    ///   left consistent (whole top-level octants are either carved or
    ///   untouched).
    pub fn insert_shape<S: CarveShape>(
        &mut self,
        shape: &S,
        token: &CancelToken,
    ) -> Result<Vec<NodeId>> {
        let bounds = shape.aabb();
        if bounds.is_degenerate() {
            return Err(CarveError::invalid_input(
                "shape bounding box is degenerate",
            ));
        }
        self.include_point(&bounds.min)?;
        self.include_point(&bounds.max)?;

        let mut affected = Vec::new();
        self.carve_into(self.root, 0, shape, token, &mut affected)?;
        debug!(leaves = affected.len(), "shape applied");
        Ok(affected)
    }

    /// Collects the existing leaves whose boxes intersect a shape,
    /// without mutating the tree.
    #[must_use]
    pub fn find_leaves<S: CarveShape>(&self, shape: &S) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if shape.classify(&node.center, node.halfwidth) == BoxRelation::Disjoint {
                continue;
            }
            if node.is_leaf() {
                found.push(id);
            } else {
                stack.extend(node.children.iter().flatten());
            }
        }
        found
    }

    /// Splits a leaf into eight children, redistributing any payload.
    ///
    /// Children get halved halfwidth and centers offset by half the
    /// child halfwidth along each octant direction. A payload on the
    /// node is scaled by 1/8 and copied to every child. Calling this
    /// on an internal node only fills in its missing children.
    pub fn subdivide(&mut self, id: NodeId) {
        for oct in 0..CHILDREN_PER_NODE {
            if self.nodes[id.index()].children[oct].is_none() {
                self.create_child(id, oct);
            }
        }
        if let Some(mut data) = self.nodes[id.index()].data.take() {
            data.subdivide(8);
            for oct in 0..CHILDREN_PER_NODE {
                if let Some(child) = self.nodes[id.index()].children[oct] {
                    self.nodes[child.index()].data = Some(data.clone());
                }
            }
        }
    }

    fn carve_into<S: CarveShape>(
        &mut self,
        id: NodeId,
        depth: u32,
        shape: &S,
        token: &CancelToken,
        affected: &mut Vec<NodeId>,
    ) -> Result<()> {
        if depth <= 1 {
            token.checkpoint()?;
        }

        let (center, halfwidth, is_leaf) = {
            let n = &self.nodes[id.index()];
            (n.center, n.halfwidth, n.is_leaf())
        };

        match shape.classify(&center, halfwidth) {
            BoxRelation::Disjoint => Ok(()),
            BoxRelation::Inside => {
                if is_leaf {
                    self.apply_shape(id, shape);
                    affected.push(id);
                    Ok(())
                } else {
                    self.carve_children(id, depth, shape, token, affected)
                }
            }
            BoxRelation::Straddles => {
                if is_leaf {
                    if depth >= self.max_depth {
                        self.apply_shape(id, shape);
                        affected.push(id);
                        return Ok(());
                    }
                    self.subdivide(id);
                }
                self.carve_children(id, depth, shape, token, affected)
            }
        }
    }

    fn carve_children<S: CarveShape>(
        &mut self,
        id: NodeId,
        depth: u32,
        shape: &S,
        token: &CancelToken,
        affected: &mut Vec<NodeId>,
    ) -> Result<()> {
        let (center, halfwidth) = {
            let n = &self.nodes[id.index()];
            (n.center, n.halfwidth)
        };
        let child_hw = halfwidth / 2.0;
        for oct in 0..CHILDREN_PER_NODE {
            let child = self.nodes[id.index()].children[oct];
            let child_center = center + child_hw * octant_offset(oct);
            if shape.classify(&child_center, child_hw) == BoxRelation::Disjoint {
                continue;
            }
            let child = match child {
                Some(c) => c,
                None => self.create_child(id, oct),
            };
            self.carve_into(child, depth + 1, shape, token, affected)?;
        }
        Ok(())
    }

    fn apply_shape<S: CarveShape>(&mut self, id: NodeId, shape: &S) {
        let (center, halfwidth) = {
            let n = &self.nodes[id.index()];
            (n.center, n.halfwidth)
        };
        let data = self.nodes[id.index()].data.get_or_insert_with(LeafData::new);
        shape.apply_to_leaf(data, &center, halfwidth);
    }

    fn create_child(&mut self, parent: NodeId, oct: usize) -> NodeId {
        let (center, halfwidth) = {
            let n = &self.nodes[parent.index()];
            (n.center, n.halfwidth)
        };
        let child_hw = halfwidth / 2.0;
        let child = Node::new(center + child_hw * octant_offset(oct), child_hw);
        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(child);
        self.nodes[parent.index()].children[oct] = Some(id);
        id
    }
}
