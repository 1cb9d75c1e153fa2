//! The BFS cost-to-go heuristic.

use nalgebra::Point3;
use tracing::debug;

use grid_dist::{GridCoord, OccupancyGrid};

use crate::bfs::Bfs3D;
use crate::INFINITE_COST;

/// Admissible workspace cost-to-go for the lattice search.
///
/// Construction copies the grid geometry and seeds walls from the distance
/// field; [`BfsHeuristic::set_goal`] starts the BFS from the goal voxel.
/// Queries take the workspace position of the state's planning link and
/// return `cost_per_cell` times the BFS cell distance, or [`INFINITE_COST`]
/// for walls and unreachable cells.
///
/// The optional *multi-frame* mode runs a second BFS queried with the end
/// effector's position; the combined heuristic takes the max of the two,
/// which stays admissible because each is a lower bound on its own.
#[derive(Debug, Clone)]
pub struct BfsHeuristic {
    bfs: Bfs3D,
    ee_bfs: Option<Bfs3D>,
    origin: Point3<f64>,
    resolution: f64,
    cost_per_cell: i32,
    inflation_radius: f64,
}

impl BfsHeuristic {
    /// Builds the wall grid from an occupancy grid.
    ///
    /// Every voxel whose distance-field value is below `inflation_radius`
    /// (the planning link's bounding-sphere radius) becomes a wall.
    #[must_use]
    pub fn new(grid: &OccupancyGrid, cost_per_cell: i32, inflation_radius: f64) -> Self {
        let (nx, ny, nz) = grid.dimensions();
        let mut bfs = Bfs3D::new(nx, ny, nz);
        let mut walls = 0usize;
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let c = GridCoord::new(x, y, z);
                    if grid.cell_distance(c) < inflation_radius {
                        bfs.set_wall(c);
                        walls += 1;
                    }
                }
            }
        }
        debug!(walls, inflation_radius, "seeded heuristic walls");
        Self {
            bfs,
            ee_bfs: None,
            origin: grid.field().origin(),
            resolution: grid.resolution(),
            cost_per_cell,
            inflation_radius,
        }
    }

    /// The inflation radius walls were seeded with.
    #[must_use]
    pub const fn inflation_radius(&self) -> f64 {
        self.inflation_radius
    }

    #[allow(clippy::cast_possible_truncation)]
    fn world_to_cell(&self, p: Point3<f64>) -> GridCoord {
        GridCoord::new(
            ((p.x - self.origin.x) / self.resolution).floor() as i32,
            ((p.y - self.origin.y) / self.resolution).floor() as i32,
            ((p.z - self.origin.z) / self.resolution).floor() as i32,
        )
    }

    /// Seeds the BFS from the goal position of the planning link.
    pub fn set_goal(&mut self, goal: Point3<f64>) {
        let cell = self.world_to_cell(goal);
        debug!(%cell, "seed heuristic goal");
        self.bfs.seed(cell);
        self.ee_bfs = None;
    }

    /// Seeds both frames of the multi-frame variant: the planning-link BFS
    /// from `goal` and a second BFS from the end effector's goal position.
    pub fn set_goal_multi(&mut self, goal: Point3<f64>, ee_goal: Point3<f64>) {
        self.set_goal(goal);
        let mut ee = self.bfs.clone();
        ee.seed(self.world_to_cell(ee_goal));
        self.ee_bfs = Some(ee);
    }

    /// Cost-to-go from a planning-link position.
    pub fn cost_to_goal(&mut self, planning_link_pos: Point3<f64>) -> i64 {
        let cell = self.world_to_cell(planning_link_pos);
        match self.bfs.distance(cell) {
            Some(d) => i64::from(d) * i64::from(self.cost_per_cell),
            None => INFINITE_COST,
        }
    }

    /// Multi-frame cost-to-go: the max over the planning-link frame and the
    /// end-effector frame. Falls back to the single frame when
    /// [`BfsHeuristic::set_goal_multi`] was not used.
    pub fn cost_to_goal_multi(
        &mut self,
        planning_link_pos: Point3<f64>,
        ee_pos: Point3<f64>,
    ) -> i64 {
        let h = self.cost_to_goal(planning_link_pos);
        let cell = self.world_to_cell(ee_pos);
        let Some(ee_bfs) = self.ee_bfs.as_mut() else {
            return h;
        };
        let h_ee = match ee_bfs.distance(cell) {
            Some(d) => i64::from(d) * i64::from(self.cost_per_cell),
            None => INFINITE_COST,
        };
        h.max(h_ee)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use grid_dist::PropagationDistanceField;
    use nalgebra::Vector3;

    fn empty_grid_20() -> OccupancyGrid {
        let field = PropagationDistanceField::new(
            Point3::origin(),
            Vector3::new(20.0, 20.0, 20.0),
            1.0,
            5.0,
        )
        .unwrap();
        OccupancyGrid::new(field)
    }

    fn center(x: i32, y: i32, z: i32) -> Point3<f64> {
        Point3::new(f64::from(x) + 0.5, f64::from(y) + 0.5, f64::from(z) + 0.5)
    }

    #[test]
    fn test_empty_grid_costs() {
        let grid = empty_grid_20();
        let mut h = BfsHeuristic::new(&grid, 100, 0.5);
        h.set_goal(center(10, 10, 10));

        assert_eq!(h.cost_to_goal(center(10, 10, 10)), 0);
        assert_eq!(h.cost_to_goal(center(10, 10, 13)), 300);
        // 26-connected: the corner is a Chebyshev 10 away.
        assert_eq!(h.cost_to_goal(center(0, 0, 0)), 1000);
    }

    #[test]
    fn test_wall_reports_infinity() {
        let mut grid = empty_grid_20();
        grid.add_points(&[center(5, 5, 5)]);
        // Inflation of 1.5 walls the obstacle cell and its face neighbors.
        let mut h = BfsHeuristic::new(&grid, 100, 1.5);
        h.set_goal(center(10, 10, 10));

        assert_eq!(h.cost_to_goal(center(5, 5, 5)), INFINITE_COST);
        assert_eq!(h.cost_to_goal(center(5, 5, 6)), INFINITE_COST);
        assert!(h.cost_to_goal(center(5, 5, 8)) < INFINITE_COST);
    }

    #[test]
    fn test_outside_grid_reports_infinity() {
        let grid = empty_grid_20();
        let mut h = BfsHeuristic::new(&grid, 100, 0.5);
        h.set_goal(center(10, 10, 10));
        assert_eq!(h.cost_to_goal(Point3::new(-3.0, 0.0, 0.0)), INFINITE_COST);
    }

    #[test]
    fn test_multi_frame_takes_max() {
        let grid = empty_grid_20();
        let mut h = BfsHeuristic::new(&grid, 100, 0.5);
        h.set_goal_multi(center(10, 10, 10), center(12, 10, 10));

        // Planning link at goal (h = 0), end effector 3 cells from its
        // seed: the combined estimate keeps the larger bound.
        let combined = h.cost_to_goal_multi(center(10, 10, 10), center(15, 10, 10));
        assert_eq!(combined, 300);
    }

    #[test]
    fn test_single_frame_fallback() {
        let grid = empty_grid_20();
        let mut h = BfsHeuristic::new(&grid, 100, 0.5);
        h.set_goal(center(10, 10, 10));
        let combined = h.cost_to_goal_multi(center(10, 10, 12), center(0, 0, 0));
        assert_eq!(combined, 200);
    }
}
