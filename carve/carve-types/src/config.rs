//! The pipeline configuration record.

use crate::{CarveError, Result};
use serde::{Deserialize, Serialize};

/// Options controlling region formation, coalescence, outlier removal,
/// and vertex snapping.
///
/// The record is deliberately closed: deserializing a document with an
/// unrecognized field is an error, so configuration typos surface
/// immediately instead of silently using defaults.
///
/// # Example
///
/// ```
/// use carve_types::ReconstructConfig;
///
/// let config = ReconstructConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.coalesce_distthresh, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReconstructConfig {
    /// Region-pair coalescence threshold, in standard deviations of
    /// face position. Pairs whose maximum normalized plane-fit error
    /// exceeds this value are not merged.
    pub coalesce_distthresh: f64,

    /// Minimum face planarity, in `[0, 1]`, for a face to join a
    /// region during flood fill.
    pub coalesce_planethresh: f64,

    /// When `true`, region plane fits use isosurface-adjusted face
    /// centers; when `false`, grid-aligned face centers.
    pub use_isosurface_pos: bool,

    /// Outlier-flip threshold: the fraction of a leaf's surface area
    /// that must disagree with its label before the leaf is flipped.
    /// Meaningful values lie in `(0.5, 1.0]`.
    pub node_outlierthresh: f64,

    /// Relative singular-value cutoff for the vertex-snapping SVD.
    /// Directions with `sigma < min_singular_value * sigma_max` fall
    /// back to the original corner position.
    pub min_singular_value: f64,

    /// Absolute-dot-product bound above which two region normals are
    /// treated as the same snapping constraint.
    pub max_colinearity: f64,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            coalesce_distthresh: 2.0,
            coalesce_planethresh: 0.5,
            use_isosurface_pos: true,
            node_outlierthresh: 1.0,
            min_singular_value: 0.1,
            max_colinearity: 0.99,
        }
    }
}

impl ReconstructConfig {
    /// Validates all numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CarveError::InvalidInput`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if !self.coalesce_distthresh.is_finite() || self.coalesce_distthresh <= 0.0 {
            return Err(CarveError::invalid_input(format!(
                "coalesce_distthresh must be positive, got {}",
                self.coalesce_distthresh
            )));
        }
        if !(0.0..=1.0).contains(&self.coalesce_planethresh) {
            return Err(CarveError::invalid_input(format!(
                "coalesce_planethresh must be in [0, 1], got {}",
                self.coalesce_planethresh
            )));
        }
        if !(self.node_outlierthresh > 0.5 && self.node_outlierthresh <= 1.0) {
            return Err(CarveError::invalid_input(format!(
                "node_outlierthresh must be in (0.5, 1], got {}",
                self.node_outlierthresh
            )));
        }
        if !self.min_singular_value.is_finite()
            || !(0.0..1.0).contains(&self.min_singular_value)
        {
            return Err(CarveError::invalid_input(format!(
                "min_singular_value must be in [0, 1), got {}",
                self.min_singular_value
            )));
        }
        if !(0.0..=1.0).contains(&self.max_colinearity) {
            return Err(CarveError::invalid_input(format!(
                "max_colinearity must be in [0, 1], got {}",
                self.max_colinearity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ReconstructConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut c = ReconstructConfig::default();
        c.coalesce_planethresh = 1.5;
        assert!(matches!(c.validate(), Err(CarveError::InvalidInput(_))));

        let mut c = ReconstructConfig::default();
        c.node_outlierthresh = 0.5;
        assert!(c.validate().is_err());

        let mut c = ReconstructConfig::default();
        c.coalesce_distthresh = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let doc = r#"{ "coalesce_distthresh": 1.5, "frobnicate": true }"#;
        let parsed: std::result::Result<ReconstructConfig, _> = serde_json::from_str(doc);
        assert!(parsed.is_err());
    }

    #[test]
    fn partial_documents_use_defaults() {
        let doc = r#"{ "coalesce_planethresh": 0.75 }"#;
        let parsed: ReconstructConfig = serde_json::from_str(doc).unwrap();
        assert!((parsed.coalesce_planethresh - 0.75).abs() < f64::EPSILON);
        assert!((parsed.coalesce_distthresh - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn round_trips_through_json() {
        let config = ReconstructConfig::default();
        let doc = serde_json::to_string(&config).unwrap();
        let back: ReconstructConfig = serde_json::from_str(&doc).unwrap();
        assert_eq!(config, back);
    }
}
