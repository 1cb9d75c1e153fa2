//! Error types for grid construction and queries.

/// Errors that can occur when building or resizing a grid.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// The grid resolution must be positive.
    #[error("grid resolution must be positive, got {0}")]
    InvalidResolution(f64),

    /// The grid dimensions must be positive along every axis.
    #[error("grid size must be positive, got {x}x{y}x{z}")]
    InvalidSize {
        /// Requested world extent along x.
        x: f64,
        /// Requested world extent along y.
        y: f64,
        /// Requested world extent along z.
        z: f64,
    },

    /// The maximum propagation distance must be positive.
    #[error("max propagation distance must be positive, got {0}")]
    InvalidMaxDistance(f64),
}
