//! Error types for sphere-model construction.

/// Errors that can occur when voxelizing shapes or building sphere trees.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SphereError {
    /// The covering-sphere radius must be positive.
    #[error("covering radius must be positive, got {0}")]
    InvalidRadius(f64),

    /// A shape dimension must be positive.
    #[error("shape dimension must be positive, got {0}")]
    InvalidDimension(f64),

    /// A sphere tree needs at least one leaf sphere.
    #[error("cannot build a sphere tree from an empty leaf set")]
    EmptyLeafSet,

    /// Mesh triangle indices referenced a vertex that does not exist.
    #[error("triangle index {index} out of range for {vertex_count} vertices")]
    BadTriangleIndex {
        /// The offending vertex index.
        index: u32,
        /// Number of vertices supplied.
        vertex_count: usize,
    },
}
