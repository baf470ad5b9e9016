//! Bulk carving drivers.

use crate::{ExtrudedPolygon, RayCarve};
use carve_octree::{NodeId, Octree};
use carve_types::{CancelToken, CarveError, Result};
use nalgebra::Point3;
use tracing::{debug, info, warn};

/// One item of the external ray stream.
///
/// Coordinates are meters; the priors are probabilities in `[0, 1]`
/// estimated upstream from local scan geometry.
#[derive(Debug, Clone, Copy)]
pub struct RaySample {
    /// Sensor position at the time of the sample.
    pub start: Point3<f64>,
    /// Measured surface point.
    pub end: Point3<f64>,
    /// Statistical weight of the sample.
    pub weight: f64,
    /// Prior that the endpoint lies on a surface.
    pub surface_prior: f64,
    /// Prior that the local surface is planar.
    pub planar_prior: f64,
    /// Prior that the endpoint lies on a corner feature.
    pub corner_prior: f64,
}

/// Outcome of a bulk carving pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarveSummary {
    /// Samples carved into the tree.
    pub carved: usize,
    /// Invalid samples skipped (and logged).
    pub skipped: usize,
    /// Total leaf applications across all carved samples.
    pub leaves_touched: usize,
}

/// Carves a stream of weighted scan rays into the tree.
///
/// Samples are pulled one at a time, so backpressure is implicit.
/// Invalid samples (non-finite endpoints, non-positive weight, priors
/// outside `[0, 1]`, coincident endpoints) are skipped and counted
/// rather than failing the pass; the summary reports both tallies.
/// Carving is associative under the payload merge law, so no ordering
/// guarantee is made beyond input order.
///
/// # Errors
///
/// - [`CarveError::Cancelled`] when the token fires between samples;
///   the tree remains consistent with every fully-processed sample
///   applied.
/// - [`CarveError::DomainTooLarge`] if a sample forces growth past the
///   depth cap.
pub fn carve_stream<I>(tree: &mut Octree, samples: I, token: &CancelToken) -> Result<CarveSummary>
where
    I: IntoIterator<Item = RaySample>,
{
    let band = tree.resolution();
    let mut summary = CarveSummary::default();

    for sample in samples {
        token.checkpoint()?;

        let ray = match RayCarve::new(
            sample.start,
            sample.end,
            sample.weight,
            sample.surface_prior,
            sample.planar_prior,
            sample.corner_prior,
            band,
        ) {
            Ok(ray) => ray,
            Err(err) => {
                debug!(%err, "skipping invalid ray sample");
                summary.skipped += 1;
                continue;
            }
        };

        match tree.insert_shape(&ray, token) {
            Ok(leaves) => {
                summary.carved += 1;
                summary.leaves_touched += leaves.len();
            }
            Err(err @ (CarveError::Cancelled | CarveError::DomainTooLarge { .. })) => {
                return Err(err);
            }
            Err(err) => {
                debug!(%err, "skipping uninsertable ray sample");
                summary.skipped += 1;
            }
        }
    }

    if summary.skipped > 0 {
        warn!(
            skipped = summary.skipped,
            carved = summary.carved,
            "carve stream finished with invalid samples"
        );
    } else {
        info!(
            carved = summary.carved,
            leaves = summary.leaves_touched,
            "carve stream finished"
        );
    }
    Ok(summary)
}

/// Imports one floorplan room into the tree, tagging intersected
/// leaves with the room index.
///
/// # Errors
///
/// Propagates growth failure and cancellation from the insertion walk.
pub fn import_room(
    tree: &mut Octree,
    room: &ExtrudedPolygon,
    token: &CancelToken,
) -> Result<Vec<NodeId>> {
    let leaves = tree.insert_shape(room, token)?;
    info!(
        room = room.room_index(),
        leaves = leaves.len(),
        "floorplan room imported"
    );
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(start: Point3<f64>, end: Point3<f64>) -> RaySample {
        RaySample {
            start,
            end,
            weight: 1.0,
            surface_prior: 0.5,
            planar_prior: 0.5,
            corner_prior: 0.5,
        }
    }

    #[test]
    fn valid_samples_carve() {
        let mut tree = Octree::new(1.0);
        let rays = vec![
            sample(Point3::origin(), Point3::new(5.0, 0.0, 0.0)),
            sample(Point3::origin(), Point3::new(0.0, 5.0, 0.0)),
        ];
        let summary = carve_stream(&mut tree, rays, &CancelToken::new()).unwrap();
        assert_eq!(summary.carved, 2);
        assert_eq!(summary.skipped, 0);
        assert!(summary.leaves_touched > 0);
    }

    #[test]
    fn invalid_samples_are_skipped_and_counted() {
        let mut tree = Octree::new(1.0);
        let mut bad_weight = sample(Point3::origin(), Point3::new(5.0, 0.0, 0.0));
        bad_weight.weight = 0.0;
        let degenerate = sample(Point3::origin(), Point3::origin());
        let rays = vec![
            bad_weight,
            degenerate,
            sample(Point3::origin(), Point3::new(5.0, 0.0, 0.0)),
        ];
        let summary = carve_stream(&mut tree, rays, &CancelToken::new()).unwrap();
        assert_eq!(summary.carved, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn cancellation_stops_the_stream() {
        let mut tree = Octree::new(1.0);
        let token = CancelToken::new();
        token.cancel();
        let rays = vec![sample(Point3::origin(), Point3::new(5.0, 0.0, 0.0))];
        assert!(matches!(
            carve_stream(&mut tree, rays, &token),
            Err(CarveError::Cancelled)
        ));
    }

    #[test]
    fn room_import_tags_leaves() {
        let mut tree = Octree::with_domain(Point3::new(5.0, 5.0, 1.0), 8.0, 1.0).unwrap();
        let room = ExtrudedPolygon::new(
            vec![[2.0, 2.0], [8.0, 2.0], [8.0, 8.0], [2.0, 8.0]],
            0.0,
            2.0,
            3,
            false,
        )
        .unwrap();
        let leaves = import_room(&mut tree, &room, &CancelToken::new()).unwrap();
        assert!(!leaves.is_empty());
        for id in leaves {
            assert_eq!(tree.leaf_data(id).unwrap().fp_room, 3);
        }
    }
}
