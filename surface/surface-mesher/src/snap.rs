//! Multi-plane vertex snapping.

use carve_types::{Point3, Vector3};
use nalgebra::{DMatrix, DVector};

/// Snaps a corner onto the intersection of its incident region
/// planes.
///
/// Each plane contributes the row `n_i^T x = n_i . p_i` of a linear
/// system. The system is solved by SVD: along right-singular
/// directions whose singular value reaches
/// `min_singular_value * sigma_max` the least-squares solution is
/// taken, and along the remaining (kernel) directions the original
/// corner position is preserved. The effect degrades gracefully with
/// the number of independent constraints:
///
/// - one plane: the corner projects onto it,
/// - two planes: the corner snaps to their intersection line,
/// - three or more: the corner snaps to the intersection point,
/// - degenerate sets fall back toward the original position.
///
/// Planes whose normal is within `max_colinearity` (absolute dot
/// product) of an already-kept normal repeat an existing constraint
/// and are dropped before solving.
#[must_use]
pub fn snap_vertex(
    planes: &[(Point3<f64>, Vector3<f64>)],
    initial: Point3<f64>,
    min_singular_value: f64,
    max_colinearity: f64,
) -> Point3<f64> {
    // Deduplicate near-collinear constraints.
    let mut kept: Vec<(Point3<f64>, Vector3<f64>)> = Vec::with_capacity(planes.len());
    for &(p, n) in planes {
        let norm = n.norm();
        if !norm.is_finite() || norm <= 0.0 {
            continue;
        }
        let unit = n / norm;
        if kept
            .iter()
            .any(|(_, k)| k.dot(&unit).abs() > max_colinearity)
        {
            continue;
        }
        kept.push((p, unit));
    }
    if kept.is_empty() {
        return initial;
    }

    let rows = kept.len();
    let mut matrix = DMatrix::<f64>::zeros(rows, 3);
    let mut rhs = DVector::<f64>::zeros(rows);
    for (i, (p, n)) in kept.iter().enumerate() {
        matrix[(i, 0)] = n.x;
        matrix[(i, 1)] = n.y;
        matrix[(i, 2)] = n.z;
        rhs[i] = n.dot(&p.coords);
    }

    let svd = matrix.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        return initial;
    };
    let sigma = &svd.singular_values;
    let sigma_max = sigma.iter().copied().fold(0.0f64, f64::max);
    if sigma_max <= 0.0 {
        return initial;
    }
    let cutoff = min_singular_value * sigma_max;

    // Start from the initial position and replace its component along
    // every well-conditioned singular direction with the constrained
    // solution; kernel directions keep the original component.
    let x0 = initial.coords;
    let mut x = x0;
    for j in 0..sigma.len() {
        let v_j = Vector3::new(v_t[(j, 0)], v_t[(j, 1)], v_t[(j, 2)]);
        if sigma[j] >= cutoff && sigma[j] > 0.0 {
            let mut b_dot_u = 0.0;
            for i in 0..rows {
                b_dot_u += rhs[i] * u[(i, j)];
            }
            x -= x0.dot(&v_j) * v_j;
            x += (b_dot_u / sigma[j]) * v_j;
        }
    }
    Point3::from(x)
}
