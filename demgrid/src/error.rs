//! Error types for the demgrid library.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while resolving, loading or assembling elevation data.
///
/// The type is `Clone` so that it can travel through [`Promise`](crate::Promise)
/// continuations, which hand every registered successor its own copy.
#[derive(Error, Debug, Clone)]
pub enum DemError {
    /// IO error outside of a tile fetch (e.g. persisting a downloaded tile).
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    /// Neither a point nor a bounding box was supplied, or the values are unusable.
    #[error("Invalid coordinates: {reason}")]
    InvalidCoordinates { reason: String },

    /// The byte-fetch collaborator failed for one tile.
    #[error("Failed to fetch tile {address}: {reason}")]
    TileFetchFailed { address: String, reason: String },

    /// The tile buffer is not a square grid of 16-bit samples.
    #[error("Invalid tile size for {address}: {size} bytes is not a square grid of 16-bit samples")]
    InvalidTileSize { address: String, size: usize },

    /// The assembler received a different number of tiles than the plan describes.
    #[error("Expected {expected} tiles for the mosaic, got {found}")]
    TileCountMismatch { expected: usize, found: usize },

    /// A tile's dimensions differ from the first tile of the mosaic.
    #[error("Tile {index} has {found} samples, expected {expected}")]
    TileSizeMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Conflicting or degenerate resample parameters.
    #[error("Invalid resample policy: {reason}")]
    InvalidResamplePolicy { reason: String },

    /// A configuration value could not be parsed.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A blocking driver found a pending future with no I/O left in flight.
    #[error("Pipeline stalled: the result can no longer settle")]
    PipelineStalled,
}

impl DemError {
    pub(crate) fn invalid_coordinates(reason: impl Into<String>) -> Self {
        DemError::InvalidCoordinates {
            reason: reason.into(),
        }
    }

    pub(crate) fn fetch_failed(address: impl Into<String>, reason: impl ToString) -> Self {
        DemError::TileFetchFailed {
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for DemError {
    fn from(err: std::io::Error) -> Self {
        DemError::Io(Arc::new(err))
    }
}

/// Result type alias using [`DemError`].
pub type Result<T> = std::result::Result<T, DemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DemError::InvalidTileSize {
            address: "N35E138.hgt".to_string(),
            size: 1001,
        };
        assert!(err.to_string().contains("1001"));
        assert!(err.to_string().contains("N35E138.hgt"));

        let err = DemError::fetch_failed("S12W077.hgt", "HTTP 404");
        assert!(err.to_string().contains("S12W077.hgt"));
        assert!(err.to_string().contains("HTTP 404"));

        let err = DemError::invalid_coordinates("missing lon");
        assert!(err.to_string().contains("missing lon"));
    }

    #[test]
    fn test_io_error_is_cloneable() {
        let err: DemError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        let copy = err.clone();
        assert!(copy.to_string().contains("gone"));
    }
}
