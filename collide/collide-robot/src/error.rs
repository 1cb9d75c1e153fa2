//! Error types for collision model construction and checking.

use plan_types::PlanError;

/// Errors from collision model construction and collision queries.
///
/// A collision is never an error; errors describe malformed models or
/// queries the checker cannot meaningfully answer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CollideError {
    /// A link name was not found in the model.
    #[error("unknown link '{0}'")]
    UnknownLink(String),

    /// Two links carry the same name.
    #[error("duplicate link '{0}'")]
    DuplicateLink(String),

    /// A group name was not found in the model.
    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    /// A collision group index was out of range.
    #[error("group index {index} out of range ({count} groups)")]
    InvalidGroup {
        /// The requested group index.
        index: usize,
        /// Number of groups in the model.
        count: usize,
    },

    /// A joint vector had the wrong number of entries.
    #[error("joint count mismatch: expected {expected}, got {actual}")]
    JointCountMismatch {
        /// Number of joint variables in the model.
        expected: usize,
        /// Number of entries supplied.
        actual: usize,
    },

    /// Sphere-model construction failed.
    #[error(transparent)]
    Sphere(#[from] collide_sphere::SphereError),

    /// The operation is recognized but intentionally unimplemented.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl From<CollideError> for PlanError {
    fn from(err: CollideError) -> Self {
        match err {
            CollideError::JointCountMismatch { expected, actual } => {
                Self::JointCountMismatch { expected, actual }
            }
            CollideError::NotImplemented(what) => Self::NotImplemented(what),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}
