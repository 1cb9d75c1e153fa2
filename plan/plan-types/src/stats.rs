//! Planner statistics.

use std::collections::BTreeMap;

/// Statistics reported alongside a planning result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanStats {
    /// Total state expansions across all search iterations.
    pub expansions: usize,
    /// Seconds until the first (most inflated) solution.
    pub initial_solution_time: f64,
    /// Total planning seconds.
    pub solution_time: f64,
    /// Inflation factor of the reported solution.
    pub solution_epsilon: f64,
    /// Cost of the reported solution.
    pub solution_cost: i64,
    /// Number of waypoints in the reported path.
    pub path_length: usize,
}

impl PlanStats {
    /// Returns the statistics as a name→value map, the way callers log and
    /// compare them.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("expansions", self.expansions as f64),
            ("initial solution planning time", self.initial_solution_time),
            ("solution planning time", self.solution_time),
            ("solution epsilon", self.solution_epsilon),
            ("solution cost", self.solution_cost as f64),
            ("path length", self.path_length as f64),
        ])
    }
}
