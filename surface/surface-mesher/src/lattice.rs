//! Per-region in-plane quadtree triangulation.
//!
//! A coalesced region is a set of axis-aligned face squares lying
//! (statistically) on one plane. Projected onto the plane's two free
//! axes, the faces become unit cells of a 2D lattice. Triangulation
//! proceeds over a quadtree of that lattice:
//!
//! - blocks that are fully covered and contain no mesh vertex in
//!   their interior merge into one coarse cell,
//! - a cell whose perimeter carries exactly four points becomes two
//!   triangles,
//! - any other cell becomes a fan around a center point.
//!
//! Perimeter points are the cell corners of the emitted cells plus
//! every discovered vertex on the cell boundary. Two cells of the
//! same region therefore enumerate identical point sets along a
//! shared edge, and a region-rim edge enumerates exactly the
//! discovered vertices, which the neighboring region enumerates
//! identically; interior edges pair up and rim edges are closed by
//! the adjacent regions.

use crate::TriangleMesh;
use carve_octree::Octree;
use carve_types::{CubeFace, Point3};
use hashbrown::{HashMap, HashSet};
use surface_boundary::{Boundary, Corner};
use surface_regions::{PlaneFit, RegionInfo};
use tracing::debug;

/// An emitted quadtree cell in lattice coordinates.
#[derive(Debug, Clone, Copy)]
struct Cell {
    x: i64,
    y: i64,
    size: i64,
}

/// Triangulates one region into the mesh.
///
/// `vertex_lookup` maps discovered corners to their global mesh
/// vertex indices; lattice points that are not discovered vertices
/// become region-local points projected onto the region plane.
pub(crate) fn triangulate_region(
    tree: &Octree,
    boundary: &Boundary,
    region: &RegionInfo,
    vertex_lookup: &HashMap<Corner, u32>,
    mesh: &mut TriangleMesh,
) {
    if region.faces().is_empty() {
        return;
    }

    // The dominant outward direction decides the projection plane.
    let direction = dominant_direction(tree, boundary, region);
    let (u_axis, v_axis) = in_plane_axes(direction);
    let w_axis = direction.axis();

    // Unit cell size: the finest face in the region.
    let unit = region
        .faces()
        .iter()
        .map(|&f| boundary.face(f).halfwidth(tree))
        .fold(f64::INFINITY, f64::min);
    let step = 2.0 * unit;

    // Stamp the faces onto the unit lattice. Faces perpendicular to
    // the projection have no in-plane extent and cannot be stamped;
    // coalescence across perpendicular directions is statistically
    // excluded, so this only guards pathological inputs.
    let mut origin_u = f64::INFINITY;
    let mut origin_v = f64::INFINITY;
    let mut mean_w = 0.0;
    let mut stamped = 0usize;
    for &f in region.faces() {
        let face = boundary.face(f);
        if face.direction.axis() != w_axis {
            continue;
        }
        let c = face.center(tree);
        let h = face.halfwidth(tree);
        origin_u = origin_u.min(c[u_axis] - h);
        origin_v = origin_v.min(c[v_axis] - h);
        mean_w += c[w_axis];
        stamped += 1;
    }
    if stamped == 0 {
        debug!("region has no projectable faces; skipped");
        return;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        mean_w /= stamped as f64;
    }

    let mut covered: HashSet<(i64, i64)> = HashSet::new();
    for &f in region.faces() {
        let face = boundary.face(f);
        if face.direction.axis() != w_axis {
            continue;
        }
        let c = face.center(tree);
        let h = face.halfwidth(tree);
        let bu = to_lattice(c[u_axis] - h - origin_u, step);
        let bv = to_lattice(c[v_axis] - h - origin_v, step);
        let extent = to_lattice(2.0 * h, step).max(1);
        for du in 0..extent {
            for dv in 0..extent {
                covered.insert((bu + du, bv + dv));
            }
        }
    }

    // Lattice positions of the region's discovered vertices.
    let mut vertex_points: HashMap<(i64, i64), u32> = HashMap::new();
    for &f in region.faces() {
        for fi in 0..4 {
            let corner = Corner::of_face(tree, boundary, f, fi);
            let Some(&index) = vertex_lookup.get(&corner) else {
                continue;
            };
            let p = corner.position(tree);
            let key = (
                to_lattice(p[u_axis] - origin_u, step),
                to_lattice(p[v_axis] - origin_v, step),
            );
            vertex_points.insert(key, index);
        }
    }

    // Adaptive cells over the covered lattice.
    let extent = covered
        .iter()
        .map(|&(x, y)| x.max(y) + 1)
        .max()
        .unwrap_or(1);
    let mut side = 1i64;
    while side < extent {
        side *= 2;
    }
    let mut cells = Vec::new();
    emit_cells(&covered, &vertex_points, 0, 0, side, &mut cells);

    // Every emitted cell corner participates in perimeter
    // enumeration, so neighboring cells of different sizes agree on
    // their shared points.
    let mut cell_corners: HashSet<(i64, i64)> = HashSet::new();
    for cell in &cells {
        cell_corners.insert((cell.x, cell.y));
        cell_corners.insert((cell.x + cell.size, cell.y));
        cell_corners.insert((cell.x + cell.size, cell.y + cell.size));
        cell_corners.insert((cell.x, cell.y + cell.size));
    }

    // Region-local points (cell corners and fan centers that are not
    // discovered vertices) are created once and projected onto the
    // region plane.
    let mut local_points: HashMap<(i64, i64), u32> = HashMap::new();
    let mut point_index = |mesh: &mut TriangleMesh, key: (i64, i64)| -> u32 {
        if let Some(&idx) = vertex_points.get(&key) {
            return idx;
        }
        if let Some(&idx) = local_points.get(&key) {
            return idx;
        }
        #[allow(clippy::cast_precision_loss)]
        let (lu, lv) = (key.0 as f64, key.1 as f64);
        let p = world_point(
            lu.mul_add(step, origin_u),
            lv.mul_add(step, origin_v),
            region.plane(),
            mean_w,
            u_axis,
            v_axis,
            w_axis,
        );
        let idx = mesh.add_vertex(p);
        local_points.insert(key, idx);
        idx
    };

    for cell in &cells {
        let perimeter = perimeter_points(cell, &cell_corners, &vertex_points);
        if perimeter.len() < 3 {
            continue;
        }
        if perimeter.len() == 4 {
            let idx: Vec<u32> = perimeter.iter().map(|&p| point_index(mesh, p)).collect();
            mesh.add_face([idx[0], idx[1], idx[2]]);
            mesh.add_face([idx[0], idx[2], idx[3]]);
            continue;
        }
        // Hanging points on the perimeter: fan around the cell center.
        #[allow(clippy::cast_precision_loss)]
        let center_uv = (
            (cell.x as f64 + cell.size as f64 / 2.0).mul_add(step, origin_u),
            (cell.y as f64 + cell.size as f64 / 2.0).mul_add(step, origin_v),
        );
        let center = world_point(
            center_uv.0,
            center_uv.1,
            region.plane(),
            mean_w,
            u_axis,
            v_axis,
            w_axis,
        );
        let center_idx = mesh.add_vertex(center);
        let idx: Vec<u32> = perimeter.iter().map(|&p| point_index(mesh, p)).collect();
        for k in 0..idx.len() {
            let a = idx[k];
            let b = idx[(k + 1) % idx.len()];
            if a != b {
                mesh.add_face([center_idx, a, b]);
            }
        }
    }
}

/// The outward cube face carrying the most face area in the region.
fn dominant_direction(tree: &Octree, boundary: &Boundary, region: &RegionInfo) -> CubeFace {
    let mut area = [0.0f64; 6];
    for &f in region.faces() {
        let face = boundary.face(f);
        area[face.direction.index()] += face.area(tree);
    }
    let mut best = CubeFace::ZPlus;
    let mut best_area = -1.0;
    for face in CubeFace::ALL {
        if area[face.index()] > best_area {
            best_area = area[face.index()];
            best = face;
        }
    }
    best
}

/// In-plane axes `(u, v)` chosen so `u x v` points along the outward
/// direction, making counter-clockwise lattice loops counter-clockwise
/// when viewed from outside the model.
fn in_plane_axes(direction: CubeFace) -> (usize, usize) {
    let a = direction.axis();
    let (u, v) = ((a + 1) % 3, (a + 2) % 3);
    if direction.sign() > 0.0 {
        (u, v)
    } else {
        (v, u)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_lattice(offset: f64, step: f64) -> i64 {
    (offset / step).round() as i64
}

/// Solves the plane equation for the third coordinate; falls back to
/// the grid plane when the fitted normal leans too far off-axis.
fn world_point(
    u: f64,
    v: f64,
    plane: &PlaneFit,
    mean_w: f64,
    u_axis: usize,
    v_axis: usize,
    w_axis: usize,
) -> Point3<f64> {
    let n = plane.normal;
    let mut p = Point3::origin();
    p[u_axis] = u;
    p[v_axis] = v;
    p[w_axis] = if n[w_axis].abs() > 0.1 {
        let rhs = n.dot(&plane.point.coords);
        (rhs - n[u_axis] * u - n[v_axis] * v) / n[w_axis]
    } else {
        mean_w
    };
    p
}

/// Emits leaf cells of the coverage quadtree. A block merges into one
/// cell when it is fully covered and no discovered vertex lies
/// strictly inside it.
fn emit_cells(
    covered: &HashSet<(i64, i64)>,
    vertex_points: &HashMap<(i64, i64), u32>,
    x: i64,
    y: i64,
    size: i64,
    out: &mut Vec<Cell>,
) {
    if size == 1 {
        if covered.contains(&(x, y)) {
            out.push(Cell { x, y, size });
        }
        return;
    }

    if block_fully_covered(covered, x, y, size) && !block_has_interior_vertex(vertex_points, x, y, size)
    {
        out.push(Cell { x, y, size });
        return;
    }
    if !block_touched(covered, x, y, size) {
        return;
    }

    let half = size / 2;
    emit_cells(covered, vertex_points, x, y, half, out);
    emit_cells(covered, vertex_points, x + half, y, half, out);
    emit_cells(covered, vertex_points, x, y + half, half, out);
    emit_cells(covered, vertex_points, x + half, y + half, half, out);
}

fn block_fully_covered(covered: &HashSet<(i64, i64)>, x: i64, y: i64, size: i64) -> bool {
    for dx in 0..size {
        for dy in 0..size {
            if !covered.contains(&(x + dx, y + dy)) {
                return false;
            }
        }
    }
    true
}

fn block_touched(covered: &HashSet<(i64, i64)>, x: i64, y: i64, size: i64) -> bool {
    covered
        .iter()
        .any(|&(cx, cy)| cx >= x && cx < x + size && cy >= y && cy < y + size)
}

fn block_has_interior_vertex(
    vertex_points: &HashMap<(i64, i64), u32>,
    x: i64,
    y: i64,
    size: i64,
) -> bool {
    vertex_points
        .keys()
        .any(|&(px, py)| px > x && px < x + size && py > y && py < y + size)
}

/// Enumerates the perimeter lattice points of a cell counter-clockwise
/// from its minimum corner: cell corners of emitted cells plus every
/// discovered vertex on the boundary.
fn perimeter_points(
    cell: &Cell,
    cell_corners: &HashSet<(i64, i64)>,
    vertex_points: &HashMap<(i64, i64), u32>,
) -> Vec<(i64, i64)> {
    let include = |p: (i64, i64)| cell_corners.contains(&p) || vertex_points.contains_key(&p);
    let (x0, y0, s) = (cell.x, cell.y, cell.size);
    let mut pts = Vec::with_capacity(8);
    for x in x0..(x0 + s) {
        let p = (x, y0);
        if include(p) {
            pts.push(p);
        }
    }
    for y in y0..(y0 + s) {
        let p = (x0 + s, y);
        if include(p) {
            pts.push(p);
        }
    }
    for x in ((x0 + 1)..=(x0 + s)).rev() {
        let p = (x, y0 + s);
        if include(p) {
            pts.push(p);
        }
    }
    for y in ((y0 + 1)..=(y0 + s)).rev() {
        let p = (x0, y);
        if include(p) {
            pts.push(p);
        }
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_are_right_handed_toward_the_outward_normal() {
        for dir in CubeFace::ALL {
            let (u, v) = in_plane_axes(dir);
            let mut eu = [0.0; 3];
            let mut ev = [0.0; 3];
            eu[u] = 1.0;
            ev[v] = 1.0;
            let cross = [
                eu[1] * ev[2] - eu[2] * ev[1],
                eu[2] * ev[0] - eu[0] * ev[2],
                eu[0] * ev[1] - eu[1] * ev[0],
            ];
            let n = dir.normal();
            assert!((cross[0] - n.x).abs() < 1e-12);
            assert!((cross[1] - n.y).abs() < 1e-12);
            assert!((cross[2] - n.z).abs() < 1e-12);
        }
    }

    #[test]
    fn full_vertex_free_block_merges() {
        let mut covered = HashSet::new();
        for x in 0..4 {
            for y in 0..4 {
                covered.insert((x, y));
            }
        }
        let mut cells = Vec::new();
        emit_cells(&covered, &HashMap::new(), 0, 0, 4, &mut cells);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].size, 4);
    }

    #[test]
    fn interior_vertex_splits_the_block() {
        let mut covered = HashSet::new();
        for x in 0..4 {
            for y in 0..4 {
                covered.insert((x, y));
            }
        }
        let mut vertices = HashMap::new();
        vertices.insert((2i64, 2i64), 0u32);
        let mut cells = Vec::new();
        emit_cells(&covered, &vertices, 0, 0, 4, &mut cells);
        // The vertex sits on the cross between the four 2x2 children,
        // which are themselves vertex-free and merge.
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| c.size == 2));
    }

    #[test]
    fn partial_coverage_descends_to_units() {
        let mut covered = HashSet::new();
        covered.insert((0i64, 0i64));
        covered.insert((1, 0));
        covered.insert((0, 1));
        let mut cells = Vec::new();
        emit_cells(&covered, &HashMap::new(), 0, 0, 2, &mut cells);
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.size == 1));
    }

    #[test]
    fn perimeter_of_a_unit_quad() {
        let cell = Cell { x: 0, y: 0, size: 1 };
        let mut corners = HashSet::new();
        corners.insert((0i64, 0i64));
        corners.insert((1, 0));
        corners.insert((1, 1));
        corners.insert((0, 1));
        let pts = perimeter_points(&cell, &corners, &HashMap::new());
        assert_eq!(pts, vec![(0, 0), (1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn hanging_vertex_appears_on_the_perimeter() {
        let cell = Cell { x: 0, y: 0, size: 2 };
        let mut corners = HashSet::new();
        for p in [(0i64, 0i64), (2, 0), (2, 2), (0, 2)] {
            corners.insert(p);
        }
        let mut vertices = HashMap::new();
        vertices.insert((1i64, 0i64), 7u32);
        let pts = perimeter_points(&cell, &corners, &vertices);
        assert_eq!(pts, vec![(0, 0), (1, 0), (2, 0), (2, 2), (0, 2)]);
    }
}
