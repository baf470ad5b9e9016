//! Edge-to-face adjacency and manifoldness checks.

use crate::TriangleMesh;
use hashbrown::HashMap;

/// Edge incidence information for a triangle mesh.
///
/// Backs the pipeline's watertightness contract: in a closed manifold
/// mesh every undirected edge is used by exactly two triangles, once
/// in each direction.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Undirected edge (lo, hi) -> adjacent face indices.
    edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
    /// Directed edge (a, b) -> use count across all faces.
    directed_uses: HashMap<(u32, u32), usize>,
}

impl MeshAdjacency {
    /// Builds adjacency from a mesh's face list.
    #[must_use]
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        let mut directed_uses: HashMap<(u32, u32), usize> = HashMap::new();

        for (face_idx, &[a, b, c]) in mesh.faces.iter().enumerate() {
            for (from, to) in [(a, b), (b, c), (c, a)] {
                edge_to_faces
                    .entry(undirected(from, to))
                    .or_default()
                    .push(face_idx);
                *directed_uses.entry((from, to)).or_default() += 1;
            }
        }

        Self {
            edge_to_faces,
            directed_uses,
        }
    }

    /// Number of distinct undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Faces adjacent to an undirected edge.
    #[must_use]
    pub fn faces_for_edge(&self, a: u32, b: u32) -> &[usize] {
        self.edge_to_faces
            .get(&undirected(a, b))
            .map_or(&[], Vec::as_slice)
    }

    /// Edges used by only one triangle (holes in the surface).
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&e, _)| e)
    }

    /// Edges used by more than two triangles.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&e, _)| e)
    }

    /// Every edge bounded by at most two triangles.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// No boundary edges: the surface is closed.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() >= 2)
    }

    /// The full closed-manifold contract: every undirected edge used
    /// exactly twice, once per direction (consistent winding).
    #[must_use]
    pub fn is_closed_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() == 2)
            && self.directed_uses.values().all(|&uses| uses == 1)
    }
}

fn undirected(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
