//! Occupancy queries over a propagation distance field.

use nalgebra::{Point3, Vector3};

use crate::field::PropagationDistanceField;
use crate::voxel::GridCoord;

/// Metric occupancy view of a [`PropagationDistanceField`].
///
/// Adds a reference-frame label and the batch point operations the collision
/// model uses to stamp link voxels in and out of the field. A cell is
/// *occupied* when its distance to the nearest obstacle is zero.
///
/// # Example
///
/// ```
/// use grid_dist::{GridCoord, OccupancyGrid, PropagationDistanceField};
/// use nalgebra::{Point3, Vector3};
///
/// let field = PropagationDistanceField::new(
///     Point3::origin(),
///     Vector3::new(4.0, 4.0, 4.0),
///     1.0,
///     2.0,
/// )
/// .unwrap();
/// let mut grid = OccupancyGrid::new(field).with_reference_frame("map");
///
/// grid.add_points(&[Point3::new(1.5, 1.5, 1.5)]);
/// assert!(grid.is_occupied(GridCoord::new(1, 1, 1)));
/// assert_eq!(grid.occupied_voxel_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    field: PropagationDistanceField,
    reference_frame: String,
}

impl OccupancyGrid {
    /// Wraps a distance field.
    #[must_use]
    pub fn new(field: PropagationDistanceField) -> Self {
        Self {
            field,
            reference_frame: String::new(),
        }
    }

    /// Sets the name of the frame the grid is expressed in.
    #[must_use]
    pub fn with_reference_frame(mut self, frame: impl Into<String>) -> Self {
        self.reference_frame = frame.into();
        self
    }

    /// Returns the name of the frame the grid is expressed in.
    #[must_use]
    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    /// Returns the wrapped distance field.
    #[must_use]
    pub const fn field(&self) -> &PropagationDistanceField {
        &self.field
    }

    /// Returns the grid dimensions in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (i32, i32, i32) {
        (
            self.field.num_cells_x(),
            self.field.num_cells_y(),
            self.field.num_cells_z(),
        )
    }

    /// Returns the cell edge length in meters.
    #[must_use]
    pub const fn resolution(&self) -> f64 {
        self.field.resolution()
    }

    /// Returns the maximum propagation distance in meters.
    #[must_use]
    pub const fn max_distance(&self) -> f64 {
        self.field.max_distance()
    }

    /// Converts a world position to the containing grid coordinate.
    #[must_use]
    pub fn world_to_grid(&self, p: Point3<f64>) -> GridCoord {
        self.field.world_to_grid(p)
    }

    /// Converts a grid coordinate to the world position of its cell center.
    #[must_use]
    pub fn grid_to_world(&self, g: GridCoord) -> Point3<f64> {
        self.field.grid_to_world(g)
    }

    /// Returns whether a grid coordinate lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, g: GridCoord) -> bool {
        self.field.in_bounds(g)
    }

    /// Distance from the cell containing `p` to the nearest obstacle.
    #[must_use]
    pub fn distance(&self, p: Point3<f64>) -> f64 {
        self.field.distance(p)
    }

    /// Distance from the center of cell `g` to the nearest obstacle.
    #[must_use]
    pub fn cell_distance(&self, g: GridCoord) -> f64 {
        self.field.cell_distance(g)
    }

    /// Trilinearly interpolated distance at `p`.
    #[must_use]
    pub fn interp_distance(&self, p: Point3<f64>) -> f64 {
        self.field.interp_distance(p)
    }

    /// Returns whether the cell at `g` holds an obstacle.
    #[must_use]
    pub fn is_occupied(&self, g: GridCoord) -> bool {
        self.field.is_cell_occupied(g)
    }

    /// Adds obstacle points. Out-of-bounds points are ignored.
    pub fn add_points(&mut self, points: &[Point3<f64>]) {
        self.field.add_points(points);
    }

    /// Removes obstacle points. Unoccupied points are ignored.
    pub fn remove_points(&mut self, points: &[Point3<f64>]) {
        self.field.remove_points(points);
    }

    /// Moves obstacle points: removes `old` then adds `new`.
    pub fn update_points(&mut self, old: &[Point3<f64>], new: &[Point3<f64>]) {
        self.field.update_points(old, new);
    }

    /// Clears all obstacles.
    pub fn reset(&mut self) {
        self.field.reset();
    }

    /// Returns the world centers of all occupied cells.
    #[must_use]
    pub fn occupied_voxels(&self) -> Vec<Point3<f64>> {
        let (nx, ny, nz) = self.dimensions();
        let mut voxels = Vec::new();
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let g = GridCoord::new(x, y, z);
                    if self.is_occupied(g) {
                        voxels.push(self.grid_to_world(g));
                    }
                }
            }
        }
        voxels
    }

    /// Returns the number of occupied cells.
    #[must_use]
    pub fn occupied_voxel_count(&self) -> usize {
        let (nx, ny, nz) = self.dimensions();
        let mut count = 0;
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    if self.is_occupied(GridCoord::new(x, y, z)) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Voxelizes an axis-aligned box (center + extents, in meters) at the
    /// grid resolution and adds the resulting points as obstacles.
    pub fn add_box(&mut self, center: Point3<f64>, extents: Vector3<f64>) {
        let res = self.resolution();
        let mut points = Vec::new();
        let half = extents * 0.5;
        let steps = |len: f64| -> i32 {
            #[allow(clippy::cast_possible_truncation)]
            let n = (len / res).floor() as i32;
            n.max(0)
        };
        for ix in 0..=steps(extents.x) {
            for iy in 0..=steps(extents.y) {
                for iz in 0..=steps(extents.z) {
                    points.push(Point3::new(
                        center.x - half.x + f64::from(ix) * res,
                        center.y - half.y + f64::from(iy) * res,
                        center.z - half.z + f64::from(iz) * res,
                    ));
                }
            }
        }
        self.add_points(&points);
    }
}
