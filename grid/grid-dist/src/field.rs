//! Propagating Euclidean distance field.
//!
//! Every cell stores the squared distance (in cells) to its nearest occupied
//! cell together with the coordinates of that cell. Insertions lower
//! distances outward from the new obstacle cells through a bucketed queue
//! (Dial's algorithm over squared distances); removals raise the affected
//! region and re-seed the propagation wavefront from its border.
//!
//! Propagation is direction-restricted: a cell that was reached from
//! direction `d` only needs to forward distance information to the
//! face-adjacent neighbors that do not oppose `d` componentwise. Freshly
//! inserted obstacle cells (and border cells re-seeded by a removal) forward
//! to all 26 neighbors.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::error::GridError;
use crate::voxel::GridCoord;

/// Number of neighbor offsets, including the null offset.
const NUM_OFFSETS: usize = 27;
/// Offset index of the null offset `(0, 0, 0)`.
const CENTER_OFFSET: usize = 13;
/// Number of update directions: one per offset, with and without the
/// fresh-source bit.
const NUM_DIRECTIONS: usize = 2 * NUM_OFFSETS;
/// Update direction of a fresh obstacle source: null offset, fresh bit set.
const FRESH_DIR: u8 = (2 * CENTER_OFFSET + 1) as u8;

/// One cell of the distance field.
#[derive(Debug, Clone, Copy)]
struct Cell {
    /// Nearest known obstacle cell, if any within the propagation radius.
    obs: Option<GridCoord>,
    /// Settled squared distance in cells.
    dist: i32,
    /// Tentative squared distance in cells.
    dist_new: i32,
    /// Update direction this cell was last reached from.
    dir: u8,
    /// Bucket the cell is queued in, or -1 when not queued.
    bucket: i32,
}

/// A dense 3D voxel grid in which every cell knows its distance to the
/// nearest occupied cell, maintained incrementally.
///
/// Distances are stored as integer squared cell counts and converted to
/// meters through a precomputed square-root table on read. Distances are
/// capped at the configured maximum propagation distance; any cell farther
/// than that from every obstacle reports exactly `max_distance`.
///
/// # Example
///
/// ```
/// use grid_dist::PropagationDistanceField;
/// use nalgebra::{Point3, Vector3};
///
/// let mut field = PropagationDistanceField::new(
///     Point3::origin(),
///     Vector3::new(10.0, 10.0, 10.0),
///     1.0,
///     5.0,
/// )
/// .unwrap();
///
/// field.add_points(&[Point3::new(5.5, 5.5, 5.5)]);
/// assert_eq!(field.distance(Point3::new(3.5, 5.5, 5.5)), 2.0);
///
/// field.remove_points(&[Point3::new(5.5, 5.5, 5.5)]);
/// assert_eq!(field.distance(Point3::new(3.5, 5.5, 5.5)), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct PropagationDistanceField {
    origin: Point3<f64>,
    resolution: f64,
    max_dist: f64,

    nx: i32,
    ny: i32,
    nz: i32,

    /// Squared max propagation distance in cells.
    dmax_sqrd: i32,

    cells: Vec<Cell>,

    /// Open list: buckets of cell indices keyed by squared distance.
    open: Vec<Vec<u32>>,
    /// Cursor of the lowest possibly non-empty bucket.
    bucket: usize,
    /// Stack of cells being raised during a removal.
    rem_stack: Vec<u32>,

    /// `sqrt_table[k] = sqrt(k) * resolution`.
    sqrt_table: Vec<f64>,

    /// The 27 neighbor offsets, indexed by `9*(dx+1) + 3*(dy+1) + (dz+1)`.
    offsets: [GridCoord; NUM_OFFSETS],
    /// Per-direction ranges into `indices`/`target_dirs`.
    ranges: [(u32, u32); NUM_DIRECTIONS],
    /// Flattened neighbor-offset indices, grouped by source direction.
    indices: Vec<u8>,
    /// Update direction assigned to the target of each entry of `indices`.
    target_dirs: Vec<u8>,
}

const fn offset_index(dx: i32, dy: i32, dz: i32) -> usize {
    (9 * (dx + 1) + 3 * (dy + 1) + (dz + 1)) as usize
}

impl PropagationDistanceField {
    /// Creates an empty field covering `size` meters from `origin`.
    ///
    /// `max_dist` is the maximum propagation distance: cells farther than
    /// this from every obstacle report exactly `max_dist`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the resolution, size, or maximum distance is
    /// not positive.
    pub fn new(
        origin: Point3<f64>,
        size: Vector3<f64>,
        resolution: f64,
        max_dist: f64,
    ) -> Result<Self, GridError> {
        if !(resolution > 0.0) {
            return Err(GridError::InvalidResolution(resolution));
        }
        if !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0) {
            return Err(GridError::InvalidSize {
                x: size.x,
                y: size.y,
                z: size.z,
            });
        }
        if !(max_dist > 0.0) {
            return Err(GridError::InvalidMaxDistance(max_dist));
        }

        #[allow(clippy::cast_possible_truncation)]
        let nx = (size.x / resolution).ceil() as i32;
        #[allow(clippy::cast_possible_truncation)]
        let ny = (size.y / resolution).ceil() as i32;
        #[allow(clippy::cast_possible_truncation)]
        let nz = (size.z / resolution).ceil() as i32;

        #[allow(clippy::cast_possible_truncation)]
        let dmax = (max_dist / resolution).ceil() as i32;
        let dmax_sqrd = dmax * dmax;

        #[allow(clippy::cast_sign_loss)]
        let sqrt_table = (0..=dmax_sqrd as usize)
            .map(|k| {
                #[allow(clippy::cast_precision_loss)]
                let k = k as f64;
                k.sqrt() * resolution
            })
            .collect();

        let mut offsets = [GridCoord::default(); NUM_OFFSETS];
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    offsets[offset_index(dx, dy, dz)] = GridCoord::new(dx, dy, dz);
                }
            }
        }

        let (ranges, indices, target_dirs) = Self::build_neighbor_tables(&offsets);

        #[allow(clippy::cast_sign_loss)]
        let cell_count = (nx * ny * nz) as usize;
        #[allow(clippy::cast_sign_loss)]
        let bucket_count = dmax_sqrd as usize + 1;

        let mut field = Self {
            origin,
            resolution,
            max_dist,
            nx,
            ny,
            nz,
            dmax_sqrd,
            cells: vec![
                Cell {
                    obs: None,
                    dist: dmax_sqrd,
                    dist_new: dmax_sqrd,
                    dir: FRESH_DIR,
                    bucket: -1,
                };
                cell_count
            ],
            open: vec![Vec::new(); bucket_count],
            bucket: bucket_count,
            rem_stack: Vec::new(),
            sqrt_table,
            offsets,
            ranges,
            indices,
            target_dirs,
        };
        field.reset();
        Ok(field)
    }

    /// Builds the flattened per-source-direction neighbor update tables.
    ///
    /// A fresh source (fresh bit set) forwards to all 26 neighbors. A
    /// directed source forwards only to face-adjacent targets that do not
    /// oppose the incoming direction componentwise.
    fn build_neighbor_tables(
        offsets: &[GridCoord; NUM_OFFSETS],
    ) -> ([(u32, u32); NUM_DIRECTIONS], Vec<u8>, Vec<u8>) {
        let mut ranges = [(0u32, 0u32); NUM_DIRECTIONS];
        let mut indices = Vec::new();
        let mut target_dirs = Vec::new();

        for dir in 0..NUM_DIRECTIONS {
            let fresh = dir & 1 == 1;
            let src = offsets[dir >> 1];

            #[allow(clippy::cast_possible_truncation)]
            let start = indices.len() as u32;
            for (oi, tgt) in offsets.iter().enumerate() {
                if oi == CENTER_OFFSET {
                    continue;
                }
                if !fresh {
                    if tgt.x.abs() + tgt.y.abs() + tgt.z.abs() != 1 {
                        continue;
                    }
                    if src.x * tgt.x < 0 || src.y * tgt.y < 0 || src.z * tgt.z < 0 {
                        continue;
                    }
                }
                #[allow(clippy::cast_possible_truncation)]
                indices.push(oi as u8);
                #[allow(clippy::cast_possible_truncation)]
                target_dirs.push((2 * oi) as u8);
            }
            #[allow(clippy::cast_possible_truncation)]
            let end = indices.len() as u32;
            ranges[dir] = (start, end);
        }

        (ranges, indices, target_dirs)
    }

    /// Returns the number of cells along x.
    #[must_use]
    pub const fn num_cells_x(&self) -> i32 {
        self.nx
    }

    /// Returns the number of cells along y.
    #[must_use]
    pub const fn num_cells_y(&self) -> i32 {
        self.ny
    }

    /// Returns the number of cells along z.
    #[must_use]
    pub const fn num_cells_z(&self) -> i32 {
        self.nz
    }

    /// Returns the cell edge length in meters.
    #[must_use]
    pub const fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Returns the maximum propagation distance in meters.
    #[must_use]
    pub const fn max_distance(&self) -> f64 {
        self.max_dist
    }

    /// Returns the world position of the grid origin (minimum corner).
    #[must_use]
    pub const fn origin(&self) -> Point3<f64> {
        self.origin
    }

    /// Returns whether a grid coordinate lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, g: GridCoord) -> bool {
        g.x >= 0 && g.x < self.nx && g.y >= 0 && g.y < self.ny && g.z >= 0 && g.z < self.nz
    }

    /// Converts a world position to the containing grid coordinate.
    ///
    /// The result may be out of bounds; check with [`Self::in_bounds`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn world_to_grid(&self, p: Point3<f64>) -> GridCoord {
        GridCoord::new(
            ((p.x - self.origin.x) / self.resolution).floor() as i32,
            ((p.y - self.origin.y) / self.resolution).floor() as i32,
            ((p.z - self.origin.z) / self.resolution).floor() as i32,
        )
    }

    /// Converts a grid coordinate to the world position of its cell center.
    #[must_use]
    pub fn grid_to_world(&self, g: GridCoord) -> Point3<f64> {
        Point3::new(
            self.origin.x + (f64::from(g.x) + 0.5) * self.resolution,
            self.origin.y + (f64::from(g.y) + 0.5) * self.resolution,
            self.origin.z + (f64::from(g.z) + 0.5) * self.resolution,
        )
    }

    #[allow(clippy::cast_sign_loss)]
    fn index(&self, g: GridCoord) -> usize {
        ((g.x * self.ny + g.y) * self.nz + g.z) as usize
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn coord_of(&self, idx: u32) -> GridCoord {
        let idx = idx as i32;
        let z = idx % self.nz;
        let y = (idx / self.nz) % self.ny;
        let x = idx / (self.nz * self.ny);
        GridCoord::new(x, y, z)
    }

    fn obstacle_at(&self, g: GridCoord) -> bool {
        self.cells[self.index(g)].obs == Some(g)
    }

    /// Returns whether the cell at `g` is an obstacle cell.
    ///
    /// Out-of-bounds coordinates are reported unoccupied.
    #[must_use]
    pub fn is_cell_occupied(&self, g: GridCoord) -> bool {
        self.in_bounds(g) && self.obstacle_at(g)
    }

    /// Returns the distance from the center of cell `g` to the nearest
    /// obstacle, clamped to [`Self::max_distance`].
    ///
    /// Out-of-bounds cells report `max_distance`.
    #[must_use]
    pub fn cell_distance(&self, g: GridCoord) -> f64 {
        if !self.in_bounds(g) {
            return self.max_dist;
        }
        self.dist_to_meters(self.cells[self.index(g)].dist)
    }

    /// Returns the distance from the cell containing `p` to the nearest
    /// obstacle, clamped to [`Self::max_distance`].
    ///
    /// Points outside the grid report `max_distance`.
    #[must_use]
    pub fn distance(&self, p: Point3<f64>) -> f64 {
        self.cell_distance(self.world_to_grid(p))
    }

    /// Trilinearly interpolated distance at `p` across the eight
    /// surrounding cell centers.
    ///
    /// Points outside the grid report `max_distance`; corner cells falling
    /// outside the grid are clamped to the boundary.
    #[must_use]
    pub fn interp_distance(&self, p: Point3<f64>) -> f64 {
        if !self.in_bounds(self.world_to_grid(p)) {
            return self.max_dist;
        }

        let ux = (p.x - self.origin.x) / self.resolution - 0.5;
        let uy = (p.y - self.origin.y) / self.resolution - 0.5;
        let uz = (p.z - self.origin.z) / self.resolution - 0.5;

        #[allow(clippy::cast_possible_truncation)]
        let (gx, gy, gz) = (
            ux.floor() as i32,
            uy.floor() as i32,
            uz.floor() as i32,
        );
        let (fx, fy, fz) = (ux - ux.floor(), uy - uy.floor(), uz - uz.floor());

        let clamp = |v: i32, n: i32| v.clamp(0, n - 1);
        let mut acc = 0.0;
        for (cx, wx) in [(gx, 1.0 - fx), (gx + 1, fx)] {
            for (cy, wy) in [(gy, 1.0 - fy), (gy + 1, fy)] {
                for (cz, wz) in [(gz, 1.0 - fz), (gz + 1, fz)] {
                    let g = GridCoord::new(
                        clamp(cx, self.nx),
                        clamp(cy, self.ny),
                        clamp(cz, self.nz),
                    );
                    acc += wx * wy * wz * self.dist_to_meters(self.cells[self.index(g)].dist);
                }
            }
        }
        acc
    }

    #[allow(clippy::cast_sign_loss)]
    fn dist_to_meters(&self, dist_sqrd: i32) -> f64 {
        if dist_sqrd >= self.dmax_sqrd {
            self.max_dist
        } else {
            self.sqrt_table[dist_sqrd as usize]
        }
    }

    /// Adds obstacle points to the field and propagates lowered distances.
    ///
    /// Points outside the grid are ignored. Points mapping to an already
    /// occupied cell are no-ops.
    pub fn add_points(&mut self, points: &[Point3<f64>]) {
        let mut seeded = 0usize;
        for &p in points {
            let g = self.world_to_grid(p);
            if !self.in_bounds(g) {
                continue;
            }
            let ci = self.index(g);
            if self.cells[ci].obs == Some(g) {
                continue;
            }
            self.cells[ci].obs = Some(g);
            self.cells[ci].dist_new = 0;
            self.cells[ci].dir = FRESH_DIR;
            #[allow(clippy::cast_possible_truncation)]
            self.enqueue(ci as u32, 0);
            seeded += 1;
        }
        debug!(seeded, total = points.len(), "add points");
        self.lower_all();
    }

    /// Removes obstacle points from the field, raising the affected region
    /// and re-propagating from its border.
    ///
    /// Points outside the grid, or not currently occupied, are ignored.
    pub fn remove_points(&mut self, points: &[Point3<f64>]) {
        let mut removed = 0usize;
        for &p in points {
            let g = self.world_to_grid(p);
            if !self.in_bounds(g) || !self.obstacle_at(g) {
                continue;
            }
            let ci = self.index(g);
            self.cells[ci].obs = None;
            self.cells[ci].dist = self.dmax_sqrd;
            self.cells[ci].dist_new = self.dmax_sqrd;
            self.cells[ci].dir = FRESH_DIR;
            #[allow(clippy::cast_possible_truncation)]
            self.rem_stack.push(ci as u32);
            removed += 1;
        }
        debug!(removed, total = points.len(), "remove points");
        self.propagate_removals();
    }

    /// Moves a set of obstacle points: removes `old` then adds `new`.
    pub fn update_points(&mut self, old: &[Point3<f64>], new: &[Point3<f64>]) {
        self.remove_points(old);
        self.add_points(new);
    }

    /// Clears all obstacles and restores every cell to `max_distance`.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell {
                obs: None,
                dist: self.dmax_sqrd,
                dist_new: self.dmax_sqrd,
                dir: FRESH_DIR,
                bucket: -1,
            };
        }
        for bucket in &mut self.open {
            bucket.clear();
        }
        self.bucket = self.open.len();
        self.rem_stack.clear();
    }

    #[allow(clippy::cast_sign_loss)]
    fn enqueue(&mut self, ci: u32, d: i32) {
        self.cells[ci as usize].bucket = d;
        self.open[d as usize].push(ci);
        if (d as usize) < self.bucket {
            self.bucket = d as usize;
        }
    }

    /// Drains the open list in bucket order, settling tentative distances
    /// and relaxing neighbors per the direction tables.
    fn lower_all(&mut self) {
        while self.bucket < self.open.len() {
            let Some(ci) = self.open[self.bucket].pop() else {
                self.bucket += 1;
                continue;
            };
            let cell = self.cells[ci as usize];

            // Drop stale entries: either the cell was re-queued elsewhere
            // since, or its tentative distance changed under this entry (a
            // raise). The latest entry for a cell clears its queued marker.
            #[allow(clippy::cast_possible_wrap)]
            let b = self.bucket as i32;
            let is_latest = cell.bucket == b;
            if is_latest {
                self.cells[ci as usize].bucket = -1;
            }
            if !is_latest || cell.dist_new != b {
                continue;
            }

            self.cells[ci as usize].dist = cell.dist_new;
            let Some(obs) = cell.obs else {
                continue;
            };

            let coord = self.coord_of(ci);
            let (lo, hi) = self.ranges[cell.dir as usize];
            for k in lo..hi {
                let off = self.offsets[self.indices[k as usize] as usize];
                let n = coord + off;
                if !self.in_bounds(n) {
                    continue;
                }
                let d = n.squared_distance(obs);
                if d >= self.dmax_sqrd {
                    continue;
                }
                let ni = self.index(n);
                if d < self.cells[ni].dist_new {
                    self.cells[ni].dist_new = d;
                    self.cells[ni].obs = Some(obs);
                    self.cells[ni].dir = self.target_dirs[k as usize];
                    #[allow(clippy::cast_possible_truncation)]
                    self.enqueue(ni as u32, d);
                }
            }
        }
    }

    /// Raises every cell whose nearest obstacle was removed and re-seeds the
    /// wavefront from cells that still have a valid nearest obstacle.
    fn propagate_removals(&mut self) {
        while let Some(ci) = self.rem_stack.pop() {
            let coord = self.coord_of(ci);
            for oi in 0..self.offsets.len() {
                if oi == CENTER_OFFSET {
                    continue;
                }
                let off = self.offsets[oi];
                let n = coord + off;
                if !self.in_bounds(n) {
                    continue;
                }
                let ni = self.index(n);
                match self.cells[ni].obs {
                    None => {}
                    Some(o) if !self.obstacle_at(o) => {
                        // Nearest obstacle is gone: raise and keep flooding.
                        self.cells[ni].obs = None;
                        self.cells[ni].dist = self.dmax_sqrd;
                        self.cells[ni].dist_new = self.dmax_sqrd;
                        #[allow(clippy::cast_possible_truncation)]
                        self.rem_stack.push(ni as u32);
                    }
                    Some(_) => {
                        // Border cell with a surviving obstacle: re-seed.
                        if self.cells[ni].bucket < 0 {
                            self.cells[ni].dir = FRESH_DIR;
                            let d = self.cells[ni].dist_new;
                            #[allow(clippy::cast_possible_truncation)]
                            self.enqueue(ni as u32, d);
                        }
                    }
                }
            }
        }
        self.lower_all();
    }

    /// Snapshot of all settled squared cell distances, for tests and
    /// diagnostics.
    #[must_use]
    pub fn squared_distances(&self) -> Vec<i32> {
        self.cells.iter().map(|c| c.dist).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn small_field() -> PropagationDistanceField {
        PropagationDistanceField::new(
            Point3::origin(),
            Vector3::new(10.0, 10.0, 10.0),
            1.0,
            5.0,
        )
        .unwrap()
    }

    fn center(g: (i32, i32, i32)) -> Point3<f64> {
        Point3::new(
            f64::from(g.0) + 0.5,
            f64::from(g.1) + 0.5,
            f64::from(g.2) + 0.5,
        )
    }

    #[test]
    fn test_invalid_construction() {
        let r = PropagationDistanceField::new(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 1.0),
            0.0,
            1.0,
        );
        assert!(matches!(r, Err(GridError::InvalidResolution(_))));

        let r = PropagationDistanceField::new(
            Point3::origin(),
            Vector3::new(0.0, 1.0, 1.0),
            0.1,
            1.0,
        );
        assert!(matches!(r, Err(GridError::InvalidSize { .. })));
    }

    #[test]
    fn test_single_obstacle_distances() {
        let mut field = small_field();
        field.add_points(&[center((5, 5, 5))]);

        assert_eq!(field.cell_distance(GridCoord::new(5, 5, 5)), 0.0);
        assert_eq!(field.cell_distance(GridCoord::new(5, 5, 6)), 1.0);
        assert_eq!(field.cell_distance(GridCoord::new(3, 5, 5)), 2.0);
        // Far corner is beyond the propagation radius and clamps.
        assert_eq!(field.cell_distance(GridCoord::new(0, 0, 0)), 5.0);
    }

    #[test]
    fn test_exact_euclidean_distances() {
        let mut field = small_field();
        field.add_points(&[center((5, 5, 5))]);

        // Diagonal neighbors carry exact squared distances.
        assert_eq!(
            field.cell_distance(GridCoord::new(6, 6, 5)),
            2.0f64.sqrt()
        );
        assert_eq!(
            field.cell_distance(GridCoord::new(6, 6, 6)),
            3.0f64.sqrt()
        );
        assert_eq!(
            field.cell_distance(GridCoord::new(8, 7, 5)),
            13.0f64.sqrt()
        );
    }

    #[test]
    fn test_remove_restores_empty_field() {
        let mut field = small_field();
        field.add_points(&[center((5, 5, 5))]);
        field.remove_points(&[center((5, 5, 5))]);

        for x in 0..10 {
            for y in 0..10 {
                for z in 0..10 {
                    assert_eq!(field.cell_distance(GridCoord::new(x, y, z)), 5.0);
                }
            }
        }
    }

    #[test]
    fn test_remove_matches_fresh_insert_of_complement() {
        let keep = center((2, 2, 2));
        let gone = center((7, 7, 7));

        let mut incremental = small_field();
        incremental.add_points(&[keep, gone]);
        incremental.remove_points(&[gone]);

        let mut fresh = small_field();
        fresh.add_points(&[keep]);

        assert_eq!(incremental.squared_distances(), fresh.squared_distances());
    }

    #[test]
    fn test_two_obstacles_nearest_wins() {
        let mut field = small_field();
        field.add_points(&[center((2, 5, 5)), center((8, 5, 5))]);

        assert_eq!(field.cell_distance(GridCoord::new(4, 5, 5)), 2.0);
        assert_eq!(field.cell_distance(GridCoord::new(6, 5, 5)), 2.0);
        // Midpoint is 3 from either.
        assert_eq!(field.cell_distance(GridCoord::new(5, 5, 5)), 3.0);
    }

    #[test]
    fn test_out_of_bounds_points_ignored() {
        let mut field = small_field();
        field.add_points(&[Point3::new(-3.0, 0.5, 0.5), Point3::new(0.5, 50.0, 0.5)]);
        assert_eq!(field.cell_distance(GridCoord::new(0, 0, 0)), 5.0);
    }

    #[test]
    fn test_update_points_moves_obstacle() {
        let mut field = small_field();
        field.add_points(&[center((2, 2, 2))]);
        field.update_points(&[center((2, 2, 2))], &[center((7, 7, 7))]);

        assert_eq!(field.cell_distance(GridCoord::new(7, 7, 7)), 0.0);
        assert_eq!(field.cell_distance(GridCoord::new(2, 2, 2)), 5.0);
    }

    #[test]
    fn test_reset_clears_obstacles() {
        let mut field = small_field();
        field.add_points(&[center((5, 5, 5))]);
        field.reset();
        assert_eq!(field.cell_distance(GridCoord::new(5, 5, 5)), 5.0);
        assert!(!field.is_cell_occupied(GridCoord::new(5, 5, 5)));
    }

    #[test]
    fn test_world_grid_round_trip() {
        let field = small_field();
        for &g in &[
            GridCoord::new(0, 0, 0),
            GridCoord::new(9, 9, 9),
            GridCoord::new(3, 7, 1),
        ] {
            assert_eq!(field.world_to_grid(field.grid_to_world(g)), g);
        }
    }

    #[test]
    fn test_interp_distance() {
        let mut field = small_field();
        field.add_points(&[center((5, 5, 5))]);

        // At a cell center the interpolation equals the cell distance.
        assert_eq!(field.interp_distance(center((5, 5, 6))), 1.0);
        // Halfway between two centers it averages them.
        let halfway = Point3::new(5.5, 5.5, 7.0);
        assert_eq!(field.interp_distance(halfway), 1.5);
        // Outside the grid the query clamps to max distance.
        assert_eq!(field.interp_distance(Point3::new(-1.0, 0.0, 0.0)), 5.0);
    }

    #[test]
    fn test_incremental_insert_lowers_existing() {
        let mut field = small_field();
        field.add_points(&[center((2, 5, 5))]);
        assert_eq!(field.cell_distance(GridCoord::new(6, 5, 5)), 4.0);
        field.add_points(&[center((8, 5, 5))]);
        assert_eq!(field.cell_distance(GridCoord::new(6, 5, 5)), 2.0);
    }
}
