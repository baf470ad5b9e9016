//! Vertex discovery, snapping, and mesh assembly.

use crate::lattice::triangulate_region;
use crate::snap::snap_vertex;
use crate::{MeshAdjacency, TriangleMesh};
use carve_octree::Octree;
use carve_types::{
    CancelToken, CarveError, Point3, ReconstructConfig, Result, Vector3,
};
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};
use surface_boundary::{Boundary, Corner, CornerMap, FaceId, SegScheme};
use surface_regions::RegionGraph;
use surface_topology::Topology;
use tracing::{debug, info};

/// Builds the watertight region mesh from a fully prepared pipeline
/// state.
///
/// Discovery walks every corner of every boundary face: a corner
/// incident on two or more regions becomes a mesh vertex, snapped onto
/// the intersection of its regions' planes (see
/// [`snap_vertex`](crate::snap_vertex)). Each region is then
/// triangulated over its in-plane quadtree, emitting triangles that
/// reference the shared vertex indices, which closes region seams by
/// construction.
///
/// # Errors
///
/// - [`CarveError::MissingReference`] when a boundary face belongs to
///   no region (stale region graph).
/// - [`CarveError::Cancelled`] between regions.
pub fn build_mesh(
    tree: &Octree,
    boundary: &Boundary,
    corners: &CornerMap,
    graph: &RegionGraph,
    config: &ReconstructConfig,
    token: &CancelToken,
) -> Result<TriangleMesh> {
    config.validate()?;

    // Vertex discovery: corners touching two or more regions.
    let mut discovered: BTreeMap<Corner, BTreeSet<FaceId>> = BTreeMap::new();
    let mut all_corners: Vec<Corner> = corners.corners().collect();
    all_corners.sort_unstable();
    for corner in all_corners {
        let mut incident: BTreeSet<FaceId> = BTreeSet::new();
        for &fid in corners.faces_for(corner) {
            let seed = graph.region_of(fid).ok_or_else(|| {
                CarveError::missing_reference(format!(
                    "boundary face {fid:?} belongs to no region"
                ))
            })?;
            incident.insert(seed);
        }
        if incident.len() >= 2 {
            discovered.insert(corner, incident);
        }
    }
    token.checkpoint()?;
    debug!(vertices = discovered.len(), "vertices discovered");

    // Snap each vertex onto its plane intersection and assign global
    // indices in corner order.
    let mut mesh = TriangleMesh::new();
    let mut vertex_lookup: HashMap<Corner, u32> = HashMap::new();
    for (corner, regions) in &discovered {
        let mut planes: Vec<(Point3<f64>, Vector3<f64>)> = Vec::with_capacity(regions.len());
        for &seed in regions {
            let info = graph.region(seed).ok_or_else(|| {
                CarveError::missing_reference(format!(
                    "vertex references missing region {seed:?}"
                ))
            })?;
            planes.push((info.plane().point, info.plane().normal));
        }
        let snapped = snap_vertex(
            &planes,
            corner.position(tree),
            config.min_singular_value,
            config.max_colinearity,
        );
        let index = mesh.add_vertex(snapped);
        vertex_lookup.insert(*corner, index);
    }

    // Triangulate every region against the shared vertex set.
    for seed in graph.region_seeds() {
        token.checkpoint()?;
        let Some(region) = graph.region(seed) else {
            continue;
        };
        triangulate_region(tree, boundary, region, &vertex_lookup, &mut mesh);
    }

    info!(
        vertices = mesh.vertex_count(),
        triangles = mesh.face_count(),
        "region mesh emitted"
    );
    Ok(mesh)
}

/// Runs the surface pipeline end to end on a carved tree.
///
/// Composes topology construction, boundary extraction under `scheme`,
/// corner mapping, region formation and coalescence, and mesh
/// emission. Outlier flipping is an optional pre-pass and is not run
/// here; call [`Topology::remove_outliers`] on the tree first when the
/// carving is noisy.
///
/// # Errors
///
/// Propagates configuration validation, region bookkeeping, and
/// cancellation errors from the individual stages.
pub fn reconstruct(
    tree: &Octree,
    scheme: SegScheme,
    config: &ReconstructConfig,
    token: &CancelToken,
) -> Result<TriangleMesh> {
    config.validate()?;
    let topo = Topology::build(tree);
    topo.verify(tree)?;

    let boundary = Boundary::extract(tree, &topo, scheme);
    let mut corners = CornerMap::build(tree, &boundary);
    corners.populate_edges(tree, &boundary);

    let mut graph = RegionGraph::build(tree, &boundary, config)?;
    graph.coalesce(tree, &boundary, token)?;

    build_mesh(tree, &boundary, &corners, &graph, config, token)
}

/// Convenience check of the watertightness contract on a finished
/// mesh.
#[must_use]
pub fn is_watertight_manifold(mesh: &TriangleMesh) -> bool {
    MeshAdjacency::build(mesh).is_closed_manifold()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_octree::LeafData;
    use carve_types::CubeFace;

    /// One solid voxel surrounded by observed empty voxels: the
    /// smallest scene with a complete, tight-variance boundary.
    fn solid_voxel_tree() -> Octree {
        let mut tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        let p = Point3::new(0.5, 0.5, 0.5);
        let id = tree.insert_point(&p).unwrap();
        tree.set_leaf_data(id, LeafData::from_sample(1.0, 1.0, 1.0, 0.0, 1.0))
            .unwrap();
        for face in CubeFace::ALL {
            let q = p + face.normal();
            let id = tree.insert_point(&q).unwrap();
            tree.set_leaf_data(id, LeafData::from_sample(1.0, 0.0, 1.0, 0.0, 1.0))
                .unwrap();
        }
        tree
    }

    #[test]
    fn solid_voxel_meshes_to_a_cube() {
        let tree = solid_voxel_tree();
        let mesh = reconstruct(
            &tree,
            SegScheme::All,
            &ReconstructConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert!(is_watertight_manifold(&mesh));

        // Vertices snapped exactly onto the voxel corners.
        for v in &mesh.vertices {
            for c in v.iter() {
                assert!(
                    (*c - 0.0).abs() < 1e-9 || (*c - 1.0).abs() < 1e-9,
                    "vertex coordinate {c} off the cube"
                );
            }
        }
    }

    #[test]
    fn cancellation_propagates() {
        let tree = solid_voxel_tree();
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            reconstruct(
                &tree,
                SegScheme::All,
                &ReconstructConfig::default(),
                &token
            ),
            Err(CarveError::Cancelled)
        ));
    }

    #[test]
    fn empty_tree_yields_an_empty_mesh() {
        let tree = Octree::with_domain(Point3::origin(), 2.0, 1.0).unwrap();
        let mesh = reconstruct(
            &tree,
            SegScheme::All,
            &ReconstructConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let tree = solid_voxel_tree();
        let config = ReconstructConfig {
            min_singular_value: 2.0,
            ..ReconstructConfig::default()
        };
        assert!(matches!(
            reconstruct(&tree, SegScheme::All, &config, &CancelToken::new()),
            Err(CarveError::InvalidInput(_))
        ));
    }
}
