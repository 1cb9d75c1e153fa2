//! The collision checker capability consumed by the planning graph.

use crate::error::PlanError;

/// Outcome of a single-state collision check.
///
/// Invalidity is a value, not an error: the search treats an invalid state
/// as "no successor" and keeps going.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validity {
    /// Whether the state is collision free.
    pub valid: bool,
    /// Minimum obstacle distance observed along the query, in meters.
    pub distance: f64,
}

/// Outcome of an interpolated state-to-state collision check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathValidity {
    /// Whether every interpolated waypoint is collision free.
    pub valid: bool,
    /// Number of waypoints in the interpolated path.
    pub path_length: usize,
    /// Number of collision checks performed.
    pub checks: usize,
    /// Minimum obstacle distance observed along the path, in meters.
    pub distance: f64,
}

/// Validity queries over joint configurations.
///
/// Checks take `&mut self`: implementations cache lazily updated
/// forward-kinematic state between queries.
pub trait CollisionChecker {
    /// Checks a single configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for malformed input (wrong joint count); a
    /// colliding state is a non-error [`Validity`].
    fn is_state_valid(&mut self, angles: &[f64]) -> Result<Validity, PlanError>;

    /// Checks the linearly interpolated path between two configurations.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for malformed input; a colliding path is a
    /// non-error [`PathValidity`].
    fn is_state_to_state_valid(
        &mut self,
        start: &[f64],
        end: &[f64],
    ) -> Result<PathValidity, PlanError>;

    /// Returns a linearly interpolated path between two configurations with
    /// at most `inc` radians of motion per joint between waypoints.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for malformed input.
    fn interpolate_path(
        &self,
        start: &[f64],
        end: &[f64],
        inc: f64,
    ) -> Result<Vec<Vec<f64>>, PlanError>;
}
