//! Outlier flipping by area-weighted neighbor vote.

use crate::Topology;
use carve_octree::{NodeId, Octree};
use carve_types::{CancelToken, Result};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

impl Topology {
    /// Flips the labels of isolated mislabeled leaves.
    ///
    /// For each leaf, the vote is the fraction of its surface area
    /// shared with neighbors whose interior/exterior label disagrees
    /// with its own; a leaf whose vote reaches `threshold` has its
    /// probability complemented (see
    /// [`carve_octree::LeafData::flip`]). Interior leaves are checked
    /// first, then exterior ones; every flip re-queues the neighbors
    /// that used to agree, since they may have become outliers
    /// themselves. Progress is guaranteed because a leaf re-enters the
    /// queues only after an adjacent flip.
    ///
    /// Thresholds outside `(0.5, 1.0]` are meaningless for a majority
    /// vote and make the pass a validated no-op.
    ///
    /// Returns the number of leaves flipped.
    ///
    /// # Errors
    ///
    /// Returns [`carve_types::CarveError::Cancelled`] when the token
    /// fires between iterations; flips already applied remain (the
    /// tree stays consistent, the pass is resumable by re-running).
    pub fn remove_outliers(
        &self,
        tree: &mut Octree,
        threshold: f64,
        token: &CancelToken,
    ) -> Result<usize> {
        if !(threshold > 0.5 && threshold <= 1.0) {
            warn!(threshold, "outlier threshold outside (0.5, 1]; skipping");
            return Ok(0);
        }

        let mut nodes: Vec<NodeId> = self.nodes().collect();
        nodes.sort_unstable();

        // Interior nodes are checked before exterior ones so that
        // spurious solid specks dissolve before free space is
        // reconsidered.
        let mut interior_queue: VecDeque<NodeId> = VecDeque::new();
        let mut exterior_queue: VecDeque<NodeId> = VecDeque::new();
        for id in nodes {
            if is_interior(tree, id) {
                interior_queue.push_back(id);
            } else {
                exterior_queue.push_back(id);
            }
        }

        let mut flipped = 0usize;
        while !(interior_queue.is_empty() && exterior_queue.is_empty()) {
            token.checkpoint()?;

            let (id, expected_interior) = match interior_queue.pop_front() {
                Some(id) => (id, true),
                None => match exterior_queue.pop_front() {
                    Some(id) => (id, false),
                    None => break,
                },
            };

            // Unobserved leaves hold no label to flip, and a leaf that
            // already flipped since being queued is done.
            if tree.leaf_data(id).is_none() {
                continue;
            }
            if is_interior(tree, id) != expected_interior {
                continue;
            }

            let my_area = tree.node(id).surface_area();
            let my_halfwidth = tree.node(id).halfwidth;

            let Some(record) = self.record(id) else {
                continue;
            };
            let neighbors: Vec<NodeId> = record.iter_all().map(|(_, n)| n).collect();

            let mut disagreeing_area = 0.0;
            for &n in &neighbors {
                if is_interior(tree, n) != expected_interior {
                    let shared = tree.node(n).halfwidth.min(my_halfwidth);
                    disagreeing_area += 4.0 * shared * shared;
                }
            }

            if disagreeing_area / my_area < threshold {
                continue;
            }

            if let Some(data) = tree.leaf_data_mut(id) {
                data.flip();
                flipped += 1;
                debug!(?id, "flipped outlier leaf");
            }

            // Neighbors that agreed with the old label now disagree
            // with the new one; they may be outliers themselves.
            for &n in &neighbors {
                if is_interior(tree, n) == expected_interior {
                    interior_queue.push_back(n);
                }
            }
        }

        info!(flipped, "outlier removal finished");
        Ok(flipped)
    }
}

fn is_interior(tree: &Octree, id: NodeId) -> bool {
    tree.leaf_data(id).is_some_and(carve_octree::LeafData::is_interior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_octree::LeafData;
    use nalgebra::Point3;

    /// A 3x3x3 grid of observed leaves inside a 4x4x4 subdivision,
    /// with the grid center at `probability = 0.9` and its 26
    /// surrounding cells at `low`.
    fn outlier_grid(low: f64) -> (Octree, NodeId) {
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        let mut center = None;
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    let p = Point3::new(
                        -0.5 + f64::from(x) - 0.5,
                        -0.5 + f64::from(y) - 0.5,
                        -0.5 + f64::from(z) - 0.5,
                    );
                    let id = tree.insert_point(&p).unwrap();
                    let prob = if (x, y, z) == (1, 1, 1) {
                        center = Some(id);
                        0.9
                    } else {
                        low
                    };
                    tree.set_leaf_data(id, LeafData::from_sample(1.0, prob, 0.0, 0.0, 0.0))
                        .unwrap();
                }
            }
        }
        (tree, center.unwrap())
    }

    #[test]
    fn surrounded_outlier_flips_at_moderate_threshold() {
        let (mut tree, center) = outlier_grid(0.1);
        let topo = Topology::build(&tree);
        let flipped = topo
            .remove_outliers(&mut tree, 0.6, &CancelToken::new())
            .unwrap();
        assert!(flipped >= 1);
        assert!(tree.leaf_data(center).unwrap().probability() < 0.5);
        // Flipping settles: the neighbors all agree now.
        let again = topo
            .remove_outliers(&mut tree, 0.6, &CancelToken::new())
            .unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn partially_agreeing_leaf_survives_a_strict_threshold() {
        // One face-neighbor agrees with the center, so only five of
        // six faces disagree: vote 5/6 < 0.99.
        let (mut tree, center) = outlier_grid(0.1);
        // The grid occupies cells centered on {-0.5, 0.5, 1.5}^3; the
        // cell straight above the center is its +z face neighbor.
        let above = Point3::new(0.5, 0.5, 1.5);
        let agree_id = tree.leaf_at(&above).unwrap();
        tree.set_leaf_data(agree_id, LeafData::from_sample(1.0, 0.9, 0.0, 0.0, 0.0))
            .unwrap();

        let topo = Topology::build(&tree);
        let p_before = tree.leaf_data(center).unwrap().probability();
        topo.remove_outliers(&mut tree, 0.99, &CancelToken::new())
            .unwrap();
        let p_after = tree.leaf_data(center).unwrap().probability();
        assert!((p_before - p_after).abs() < 1e-12, "center must not flip");

        // The same configuration flips at a moderate threshold.
        topo.remove_outliers(&mut tree, 0.6, &CancelToken::new())
            .unwrap();
        assert!(tree.leaf_data(center).unwrap().probability() < 0.5);
    }

    #[test]
    fn out_of_range_threshold_is_a_no_op() {
        let (mut tree, center) = outlier_grid(0.1);
        let topo = Topology::build(&tree);
        for bad in [0.0, 0.5, 1.5, -1.0] {
            let flipped = topo
                .remove_outliers(&mut tree, bad, &CancelToken::new())
                .unwrap();
            assert_eq!(flipped, 0);
        }
        assert!(tree.leaf_data(center).unwrap().probability() > 0.5);
    }

    #[test]
    fn cancellation_propagates() {
        let (mut tree, _) = outlier_grid(0.1);
        let topo = Topology::build(&tree);
        let token = CancelToken::new();
        token.cancel();
        assert!(topo.remove_outliers(&mut tree, 0.6, &token).is_err());
    }

    #[test]
    fn agreeing_neighborhood_is_stable() {
        let (mut tree, center) = outlier_grid(0.9);
        let topo = Topology::build(&tree);
        let flipped = topo
            .remove_outliers(&mut tree, 0.6, &CancelToken::new())
            .unwrap();
        // The solid 3x3x3 block's center agrees with everything; the
        // block's faces touch unobserved space, which holds no label
        // and casts no vote.
        assert_eq!(flipped, 0);
        assert!(tree.leaf_data(center).unwrap().probability() > 0.5);
    }
}
