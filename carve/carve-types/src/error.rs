//! Error types shared by the voxcarve pipeline.

use thiserror::Error;

/// Errors that can occur across the reconstruction pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CarveError {
    /// Malformed shape, zero-weight sample, or out-of-range option.
    ///
    /// Rejected at the call boundary; bulk phases skip and count
    /// invalid items instead of failing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Growing the octree domain would exceed implementation limits.
    #[error("domain too large: growth to relative depth {requested} exceeds limit {limit}")]
    DomainTooLarge {
        /// The relative depth growth would have reached.
        requested: u32,
        /// The maximum supported relative depth.
        limit: u32,
    },

    /// A topology contract violation: neighbor asymmetry, a
    /// non-touching pair, or a self-cycle. Fatal for the operation
    /// that detected it.
    #[error("inconsistent topology: {0}")]
    InconsistentTopology(String),

    /// A derived structure references a node, face, or region seed
    /// that no longer exists. Fatal; indicates stale handles.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Cooperative cancellation fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Persistence read/write failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CarveError {
    /// Creates an [`CarveError::InvalidInput`] from any message.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Creates an [`CarveError::InconsistentTopology`] from any message.
    #[must_use]
    pub fn inconsistent_topology(reason: impl Into<String>) -> Self {
        Self::InconsistentTopology(reason.into())
    }

    /// Creates a [`CarveError::MissingReference`] from any message.
    #[must_use]
    pub fn missing_reference(reason: impl Into<String>) -> Self {
        Self::MissingReference(reason.into())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, CarveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render_their_kind() {
        let e = CarveError::invalid_input("weight must be positive");
        assert!(e.to_string().contains("invalid input"));

        let e = CarveError::DomainTooLarge {
            requested: 40,
            limit: 31,
        };
        assert!(e.to_string().contains("40"));
        assert!(e.to_string().contains("31"));

        let e = CarveError::inconsistent_topology("asymmetric neighbors");
        assert!(e.to_string().contains("asymmetric"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let e: CarveError = io.into();
        assert!(matches!(e, CarveError::Io(_)));
    }
}
