//! The planar-region graph: formation and coalescence.

use crate::{face_planarity, isosurface_position, position_variance, PlaneFit};
use carve_octree::Octree;
use carve_types::{CancelToken, CarveError, Point3, ReconstructConfig, Result};
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use std::collections::{BinaryHeap, BTreeSet, VecDeque};
use surface_boundary::{Boundary, FaceId};
use tracing::{debug, info};

/// One planar region: a face set, its fitted plane, and the seeds of
/// the neighboring regions.
#[derive(Debug, Clone)]
pub struct RegionInfo {
    faces: Vec<FaceId>,
    plane: PlaneFit,
    neighbor_seeds: BTreeSet<FaceId>,
    // Cached per-face statistics, parallel vectors in face order.
    centers: Vec<Point3<f64>>,
    variances: Vec<f64>,
}

impl RegionInfo {
    fn new(faces: Vec<FaceId>, plane: PlaneFit) -> Self {
        Self {
            faces,
            plane,
            neighbor_seeds: BTreeSet::new(),
            centers: Vec::new(),
            variances: Vec::new(),
        }
    }

    /// The faces belonging to this region.
    #[must_use]
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    /// Number of faces in the region.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The region's current plane (seed geometry before coalescence,
    /// the latest accepted fit afterwards).
    #[must_use]
    pub const fn plane(&self) -> &PlaneFit {
        &self.plane
    }

    /// Seeds of the neighboring regions, in seed order.
    pub fn neighbor_seeds(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.neighbor_seeds.iter().copied()
    }
}

/// A candidate merge of two regions, scored by the worst normalized
/// distance of any member face center to the joint plane fit.
#[derive(Debug, Clone)]
struct Pair {
    first: FaceId,
    second: FaceId,
    plane: PlaneFit,
    max_err: f64,
    num_faces: usize,
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for Pair {}

impl PartialOrd for Pair {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pair {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: the smallest error is the greatest priority; on
        // ties, the larger pairing goes first.
        other
            .max_err
            .total_cmp(&self.max_err)
            .then(self.num_faces.cmp(&other.num_faces))
    }
}

/// The set of planar regions over a boundary, with neighbor links.
///
/// Formation flood-fills boundary faces into same-direction planar
/// groups; [`RegionGraph::coalesce`] then greedily merges neighboring
/// regions while the merged plane fit stays within the configured
/// statistical tolerance. The face partition is total and disjoint at
/// every step.
#[derive(Debug, Clone)]
pub struct RegionGraph {
    regions: HashMap<FaceId, RegionInfo>,
    seeds: HashMap<FaceId, FaceId>,
    planethresh: f64,
    distthresh: f64,
    min_singular_value: f64,
    use_iso: bool,
}

impl RegionGraph {
    /// Forms the initial regions of a boundary.
    ///
    /// Each unassigned face seeds a flood fill that accepts linked
    /// faces matching the seed's direction with planarity at or above
    /// `coalesce_planethresh`; a seed that itself fails the threshold
    /// becomes a singleton region. Region adjacency is then derived
    /// from the face linkage.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] for an invalid
    /// configuration and [`CarveError::MissingReference`] if the face
    /// linkage references a face outside the boundary (a contract
    /// violation).
    pub fn build(
        tree: &Octree,
        boundary: &Boundary,
        config: &ReconstructConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut graph = Self {
            regions: HashMap::new(),
            seeds: HashMap::new(),
            planethresh: config.coalesce_planethresh,
            distthresh: config.coalesce_distthresh,
            min_singular_value: config.min_singular_value,
            use_iso: config.use_isosurface_pos,
        };

        let mut blacklist: HashSet<FaceId> = HashSet::new();
        for seed in boundary.ids() {
            if blacklist.contains(&seed) {
                continue;
            }
            let faces = graph.floodfill(tree, boundary, seed, &mut blacklist);
            for &f in &faces {
                graph.seeds.insert(f, seed);
            }
            let seed_face = boundary.face(seed);
            let plane =
                PlaneFit::from_point_normal(seed_face.center(tree), seed_face.normal());
            graph.regions.insert(seed, RegionInfo::new(faces, plane));
        }

        graph.populate_neighbor_seeds(boundary)?;
        debug!(regions = graph.regions.len(), "regions formed");
        Ok(graph)
    }

    /// Number of regions in the current partition.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// The region seeds, sorted.
    #[must_use]
    pub fn region_seeds(&self) -> Vec<FaceId> {
        let mut seeds: Vec<FaceId> = self.regions.keys().copied().collect();
        seeds.sort_unstable();
        seeds
    }

    /// A region by its seed.
    #[must_use]
    pub fn region(&self, seed: FaceId) -> Option<&RegionInfo> {
        self.regions.get(&seed)
    }

    /// The seed of the region a face belongs to.
    #[must_use]
    pub fn region_of(&self, face: FaceId) -> Option<FaceId> {
        self.seeds.get(&face).copied()
    }

    /// Greedily merges neighboring regions.
    ///
    /// All adjacent pairs are scored by the worst normalized plane-fit
    /// error of the union and kept in a priority queue, best first.
    /// Each popped pair either aborts the loop (error above
    /// `coalesce_distthresh`), is discarded (a side no longer exists),
    /// is rescored and re-queued (stale face-count checksum), or is
    /// merged, after which the survivor's new pairings enter the
    /// queue.
    ///
    /// # Errors
    ///
    /// - [`CarveError::Cancelled`] between iterations.
    /// - [`CarveError::MissingReference`] /
    ///   [`CarveError::InconsistentTopology`] on bookkeeping contract
    ///   violations.
    pub fn coalesce(
        &mut self,
        tree: &Octree,
        boundary: &Boundary,
        token: &CancelToken,
    ) -> Result<()> {
        let seeds = self.region_seeds();
        for &seed in &seeds {
            self.refresh_cache(tree, boundary, seed);
        }

        // Score every adjacent pair once, in parallel; the mutating
        // loop below is strictly serial.
        let mut candidates: Vec<(FaceId, FaceId)> = Vec::new();
        for &seed in &seeds {
            if let Some(info) = self.regions.get(&seed) {
                for n in info.neighbor_seeds() {
                    if seed < n {
                        candidates.push((seed, n));
                    }
                }
            }
        }
        let scored: Vec<Pair> = candidates
            .par_iter()
            .filter_map(|&(a, b)| self.score(tree, boundary, a, b))
            .collect();
        let before = self.regions.len();
        let mut heap = BinaryHeap::from(scored);

        while let Some(pair) = heap.pop() {
            token.checkpoint()?;

            if !(pair.max_err <= self.distthresh) {
                // The best remaining pair is already too bad.
                break;
            }
            let (Some(first), Some(second)) = (
                self.regions.get(&pair.first),
                self.regions.get(&pair.second),
            ) else {
                continue;
            };

            // A merge since scoring changes the face count; rescore
            // against the current partition and requeue.
            if first.face_count() + second.face_count() != pair.num_faces {
                self.refresh_cache(tree, boundary, pair.first);
                self.refresh_cache(tree, boundary, pair.second);
                if let Some(rescored) = self.score(tree, boundary, pair.first, pair.second) {
                    heap.push(rescored);
                }
                continue;
            }

            self.merge_pair(&pair)?;

            let new_neighbors: Vec<FaceId> = self
                .regions
                .get(&pair.first)
                .map(|info| info.neighbor_seeds().collect())
                .unwrap_or_default();
            for n in new_neighbors {
                self.refresh_cache(tree, boundary, n);
                if let Some(p) = self.score(tree, boundary, pair.first, n) {
                    heap.push(p);
                }
            }
        }

        info!(
            before,
            after = self.regions.len(),
            "region coalescence finished"
        );
        Ok(())
    }

    fn floodfill(
        &self,
        tree: &Octree,
        boundary: &Boundary,
        seed: FaceId,
        blacklist: &mut HashSet<FaceId>,
    ) -> Vec<FaceId> {
        let seed_dir = boundary.face(seed).direction;

        // A seed below the planarity threshold cannot recruit anything
        // and lives alone.
        if face_planarity(tree, boundary.face(seed)) < self.planethresh {
            blacklist.insert(seed);
            return vec![seed];
        }

        let mut faces = Vec::new();
        let mut queue: VecDeque<FaceId> = VecDeque::new();
        queue.push_back(seed);
        while let Some(f) = queue.pop_front() {
            if blacklist.contains(&f) {
                continue;
            }
            if boundary.face(f).direction != seed_dir {
                continue;
            }
            if face_planarity(tree, boundary.face(f)) < self.planethresh {
                continue;
            }
            blacklist.insert(f);
            faces.push(f);
            queue.extend(boundary.face_neighbors(f).iter().copied());
        }
        faces
    }

    fn populate_neighbor_seeds(&mut self, boundary: &Boundary) -> Result<()> {
        let seeds_of_regions = self.region_seeds();
        for seed in seeds_of_regions {
            let Some(info) = self.regions.get(&seed) else {
                continue;
            };
            let mut neighbor_seeds = BTreeSet::new();
            for &f in &info.faces {
                for &n in boundary.face_neighbors(f) {
                    let ns = self.seeds.get(&n).copied().ok_or_else(|| {
                        CarveError::missing_reference(format!(
                            "linked face {n:?} belongs to no region"
                        ))
                    })?;
                    if ns != seed {
                        neighbor_seeds.insert(ns);
                    }
                }
            }
            if let Some(info) = self.regions.get_mut(&seed) {
                info.neighbor_seeds = neighbor_seeds;
            }
        }
        Ok(())
    }

    /// Recomputes the cached face centers and variances of a region if
    /// they are out of date.
    fn refresh_cache(&mut self, tree: &Octree, boundary: &Boundary, seed: FaceId) {
        let use_iso = self.use_iso;
        let Some(info) = self.regions.get_mut(&seed) else {
            return;
        };
        if info.centers.len() == info.faces.len() {
            return;
        }
        info.centers.clear();
        info.variances.clear();
        for &f in &info.faces {
            let face = boundary.face(f);
            info.centers.push(isosurface_position(tree, face, use_iso));
            info.variances.push(position_variance(tree, face));
        }
    }

    /// Scores a candidate pair against the joint plane fit. Requires
    /// both regions' caches to be fresh. Returns `None` when either
    /// region no longer exists.
    fn score(
        &self,
        _tree: &Octree,
        boundary: &Boundary,
        first: FaceId,
        second: FaceId,
    ) -> Option<Pair> {
        let a = self.regions.get(&first)?;
        let b = self.regions.get(&second)?;

        let mut centers = Vec::with_capacity(a.centers.len() + b.centers.len());
        centers.extend_from_slice(&a.centers);
        centers.extend_from_slice(&b.centers);

        let fallback = boundary.face(first).normal();
        let plane = PlaneFit::fit(&centers, fallback, self.min_singular_value);

        let mut max_err = 0.0f64;
        for (center, &var) in centers
            .iter()
            .zip(a.variances.iter().chain(b.variances.iter()))
        {
            let dist = plane.distance_to(center);
            let err = if var > 0.0 {
                dist / var.sqrt()
            } else if dist <= 1e-12 {
                0.0
            } else {
                f64::INFINITY
            };
            if !err.is_finite() {
                max_err = f64::INFINITY;
                break;
            }
            max_err = max_err.max(err);
        }

        Some(Pair {
            first,
            second,
            plane,
            max_err,
            num_faces: centers.len(),
        })
    }

    /// Merges `pair.second` into `pair.first`.
    fn merge_pair(&mut self, pair: &Pair) -> Result<()> {
        let second = self.regions.remove(&pair.second).ok_or_else(|| {
            CarveError::missing_reference(format!(
                "merge target {:?} no longer exists",
                pair.second
            ))
        })?;

        // Every swallowed face now answers to the survivor's seed.
        for &f in &second.faces {
            self.seeds.insert(f, pair.first);
        }

        // The swallowed region's neighbors re-point at the survivor.
        for &n in &second.neighbor_seeds {
            if n == pair.first {
                continue;
            }
            let info = self.regions.get_mut(&n).ok_or_else(|| {
                CarveError::missing_reference(format!(
                    "neighbor seed {n:?} of merged region no longer exists"
                ))
            })?;
            info.neighbor_seeds.remove(&pair.second);
            info.neighbor_seeds.insert(pair.first);
        }

        let first = self.regions.get_mut(&pair.first).ok_or_else(|| {
            CarveError::missing_reference(format!(
                "merge survivor {:?} no longer exists",
                pair.first
            ))
        })?;
        first.faces.extend_from_slice(&second.faces);
        first.centers.extend_from_slice(&second.centers);
        first.variances.extend_from_slice(&second.variances);
        for n in second.neighbor_seeds {
            if n != pair.first {
                first.neighbor_seeds.insert(n);
            }
        }
        first.neighbor_seeds.remove(&pair.second);
        first.neighbor_seeds.remove(&pair.first);
        first.plane = pair.plane;

        if first.faces.len() != pair.num_faces {
            return Err(CarveError::inconsistent_topology(format!(
                "merged region holds {} faces but the scored pair had {}",
                first.faces.len(),
                pair.num_faces
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_octree::LeafData;
    use surface_boundary::SegScheme;
    use surface_topology::Topology;

    fn config() -> ReconstructConfig {
        ReconstructConfig {
            use_isosurface_pos: false,
            ..ReconstructConfig::default()
        }
    }

    /// Builds solid leaves plus observed-empty leaves around them, as
    /// a real carve pass would: the empty evidence keeps the face
    /// position variances tight, so perpendicular regions score an
    /// unmergeable error while coplanar ones score zero.
    fn scene(leaves: &[(Point3<f64>, f64)]) -> (Octree, Boundary) {
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        let mut solids = Vec::new();
        for &(p, planar) in leaves {
            let id = tree.insert_point(&p).unwrap();
            tree.set_leaf_data(id, LeafData::from_sample(1.0, 1.0, 0.5, 0.0, planar))
                .unwrap();
            solids.push(p);
        }
        for &(p, planar) in leaves {
            for face in carve_types::CubeFace::ALL {
                let n = p + face.normal();
                if solids.iter().any(|s| (s - n).norm() < 1e-9) {
                    continue;
                }
                let id = tree.insert_point(&n).unwrap();
                if tree.leaf_data(id).is_none() {
                    tree.set_leaf_data(
                        id,
                        LeafData::from_sample(1.0, 0.0, 0.5, 0.0, planar),
                    )
                    .unwrap();
                }
            }
        }
        let topo = Topology::build(&tree);
        let boundary = Boundary::extract(&tree, &topo, SegScheme::All);
        (tree, boundary)
    }

    fn assert_partition(graph: &RegionGraph, boundary: &Boundary) {
        let mut seen: HashSet<FaceId> = HashSet::new();
        for seed in graph.region_seeds() {
            for &f in graph.region(seed).unwrap().faces() {
                assert!(seen.insert(f), "face {f:?} in two regions");
                assert_eq!(graph.region_of(f), Some(seed));
            }
        }
        assert_eq!(seen.len(), boundary.len(), "partition must be total");
    }

    #[test]
    fn single_voxel_forms_six_regions() {
        let (tree, boundary) = scene(&[(Point3::new(0.5, 0.5, 0.5), 1.0)]);
        let graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        assert_eq!(graph.region_count(), 6);
        assert_partition(&graph, &boundary);
    }

    #[test]
    fn coplanar_faces_flood_into_one_region() {
        // A 2x1 bar: the two top faces are linked, coplanar, and
        // planar enough to grow together at formation time.
        let (tree, boundary) = scene(&[
            (Point3::new(-0.5, 0.5, 0.5), 1.0),
            (Point3::new(0.5, 0.5, 0.5), 1.0),
        ]);
        let graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        // A bar has 6 logical sides; each flood fill captured both
        // faces of the long sides.
        assert_eq!(graph.region_count(), 6);
        assert_partition(&graph, &boundary);
    }

    #[test]
    fn neighbor_seeds_are_symmetric() {
        let (tree, boundary) = scene(&[(Point3::new(0.5, 0.5, 0.5), 1.0)]);
        let graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        for seed in graph.region_seeds() {
            for n in graph.region(seed).unwrap().neighbor_seeds() {
                let back: Vec<FaceId> =
                    graph.region(n).unwrap().neighbor_seeds().collect();
                assert!(back.contains(&seed));
            }
        }
    }

    #[test]
    fn low_planarity_seed_is_a_singleton_until_coalescence() {
        // A 3x1 bar whose middle leaf has a weak planarity prior: the
        // flood fill splits each long side into three regions, and
        // coalescence welds them back into one plane per side.
        let (tree, boundary) = scene(&[
            (Point3::new(-1.5, 0.5, 0.5), 1.0),
            (Point3::new(-0.5, 0.5, 0.5), 0.2),
            (Point3::new(0.5, 0.5, 0.5), 1.0),
        ]);
        let mut graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        // 6 logical sides, 4 long sides split 3 ways = 6 + 4*2 extra.
        assert_eq!(graph.region_count(), 14);
        assert_partition(&graph, &boundary);

        graph
            .coalesce(&tree, &boundary, &CancelToken::new())
            .unwrap();
        assert_eq!(graph.region_count(), 6);
        assert_partition(&graph, &boundary);

        // Each long side is now one region of three faces whose plane
        // normal is axis-aligned.
        for seed in graph.region_seeds() {
            let info = graph.region(seed).unwrap();
            let n = info.plane().normal;
            let max_c = n.x.abs().max(n.y.abs()).max(n.z.abs());
            assert!(max_c > 1.0 - 1e-6, "normal {n:?} not axis aligned");
        }
    }

    #[test]
    fn coalescence_respects_the_distance_threshold() {
        // Perpendicular regions of a cube must never merge.
        let (tree, boundary) = scene(&[(Point3::new(0.5, 0.5, 0.5), 1.0)]);
        let mut graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        graph
            .coalesce(&tree, &boundary, &CancelToken::new())
            .unwrap();
        assert_eq!(graph.region_count(), 6);
        assert_partition(&graph, &boundary);
    }

    #[test]
    fn cancellation_propagates() {
        let (tree, boundary) = scene(&[(Point3::new(0.5, 0.5, 0.5), 1.0)]);
        let mut graph = RegionGraph::build(&tree, &boundary, &config()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            graph.coalesce(&tree, &boundary, &token),
            Err(CarveError::Cancelled)
        ));
    }
}
