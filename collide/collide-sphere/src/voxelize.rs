//! Covering-sphere centers for primitive collision shapes.
//!
//! Given a shape and a target sphere radius, each function returns a set of
//! centers such that every point of the shape is within the radius of some
//! center. Centers are spaced `2r/√3` apart: a cube of that edge length has a
//! half-diagonal of exactly `r`, so the spheres centered on a cubic tiling
//! cover space with no gaps.

use nalgebra::{Point3, Vector3};

use crate::error::SphereError;

/// Center spacing that guarantees coverage: the cube inscribed in a sphere
/// of radius `r` has edge `2r/√3`.
fn spacing(radius: f64) -> f64 {
    2.0 * radius / 3.0f64.sqrt()
}

fn check_radius(radius: f64) -> Result<(), SphereError> {
    if radius > 0.0 {
        Ok(())
    } else {
        Err(SphereError::InvalidRadius(radius))
    }
}

fn check_dim(dim: f64) -> Result<(), SphereError> {
    if dim > 0.0 {
        Ok(())
    } else {
        Err(SphereError::InvalidDimension(dim))
    }
}

/// Midpoints of `n` equal segments tiling `[-len/2, len/2]`, where `n` is the
/// smallest count whose segment length does not exceed the covering spacing.
fn tile_axis(len: f64, step: f64) -> Vec<f64> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = ((len / step).ceil() as usize).max(1);
    #[allow(clippy::cast_precision_loss)]
    let actual = len / n as f64;
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            -len / 2.0 + (i + 0.5) * actual
        })
        .collect()
}

/// Covering-sphere centers for an axis-aligned box of the given side
/// lengths, centered at the origin.
///
/// # Errors
///
/// Returns an error if the radius or any side length is not positive.
pub fn box_spheres(
    length: f64,
    width: f64,
    height: f64,
    radius: f64,
) -> Result<Vec<Point3<f64>>, SphereError> {
    check_radius(radius)?;
    check_dim(length)?;
    check_dim(width)?;
    check_dim(height)?;

    let s = spacing(radius);
    let mut centers = Vec::new();
    for &x in &tile_axis(length, s) {
        for &y in &tile_axis(width, s) {
            for &z in &tile_axis(height, s) {
                centers.push(Point3::new(x, y, z));
            }
        }
    }
    Ok(centers)
}

/// Covering-sphere centers for a solid sphere of radius `cradius` centered
/// at the origin.
///
/// A shape no larger than the covering radius collapses to a single center.
///
/// # Errors
///
/// Returns an error if either radius is not positive.
pub fn sphere_spheres(cradius: f64, radius: f64) -> Result<Vec<Point3<f64>>, SphereError> {
    check_radius(radius)?;
    check_dim(cradius)?;

    if cradius <= radius {
        return Ok(vec![Point3::origin()]);
    }

    let s = spacing(radius);
    let side = 2.0 * cradius;
    let mut centers = Vec::new();
    for &x in &tile_axis(side, s) {
        for &y in &tile_axis(side, s) {
            for &z in &tile_axis(side, s) {
                if x * x + y * y + z * z <= cradius * cradius {
                    centers.push(Point3::new(x, y, z));
                }
            }
        }
    }
    Ok(centers)
}

/// Covering-sphere centers for a cylinder of radius `cradius` and height
/// `cheight`, axis along z, centered at the origin.
///
/// The cylinder is tiled as a stack of disks; each disk is a square tiling
/// with centers outside the disk radius rejected.
///
/// # Errors
///
/// Returns an error if the radius or either dimension is not positive.
pub fn cylinder_spheres(
    cradius: f64,
    cheight: f64,
    radius: f64,
) -> Result<Vec<Point3<f64>>, SphereError> {
    check_radius(radius)?;
    check_dim(cradius)?;
    check_dim(cheight)?;

    let s = spacing(radius);
    let side = 2.0 * cradius;
    let mut centers = Vec::new();
    for &z in &tile_axis(cheight, s) {
        for &x in &tile_axis(side, s) {
            for &y in &tile_axis(side, s) {
                if x * x + y * y <= cradius * cradius {
                    centers.push(Point3::new(x, y, z));
                }
            }
        }
    }
    Ok(centers)
}

/// Covering-sphere centers for a cone with base radius `cradius` at
/// `z = -cheight/2` tapering to its apex at `z = +cheight/2`.
///
/// # Errors
///
/// Returns an error if the radius or either dimension is not positive.
pub fn cone_spheres(
    cradius: f64,
    cheight: f64,
    radius: f64,
) -> Result<Vec<Point3<f64>>, SphereError> {
    check_radius(radius)?;
    check_dim(cradius)?;
    check_dim(cheight)?;

    let s = spacing(radius);
    let side = 2.0 * cradius;
    let mut centers = Vec::new();
    for &z in &tile_axis(cheight, s) {
        // Disk radius tapers linearly from the base to the apex.
        let disk_r = cradius * (0.5 - z / cheight);
        for &x in &tile_axis(side, s) {
            for &y in &tile_axis(side, s) {
                if x * x + y * y <= disk_r * disk_r {
                    centers.push(Point3::new(x, y, z));
                }
            }
        }
    }
    Ok(centers)
}

/// Covering-sphere centers for a triangle mesh.
///
/// Each triangle's bounding box is sampled on the covering grid; a sample is
/// kept when its distance to the triangle's plane is below the radius.
///
/// # Errors
///
/// Returns an error if the radius is not positive or a triangle references a
/// missing vertex.
pub fn mesh_spheres(
    vertices: &[Point3<f64>],
    triangles: &[[u32; 3]],
    radius: f64,
) -> Result<Vec<Point3<f64>>, SphereError> {
    check_radius(radius)?;

    let vertex = |i: u32| -> Result<Point3<f64>, SphereError> {
        vertices
            .get(i as usize)
            .copied()
            .ok_or(SphereError::BadTriangleIndex {
                index: i,
                vertex_count: vertices.len(),
            })
    };

    let s = spacing(radius);
    let mut centers = Vec::new();
    for tri in triangles {
        let a = vertex(tri[0])?;
        let b = vertex(tri[1])?;
        let c = vertex(tri[2])?;

        let normal: Vector3<f64> = (b - a).cross(&(c - a));
        let norm = normal.norm();
        if norm <= f64::EPSILON {
            continue; // degenerate triangle
        }
        let normal = normal / norm;

        let min = Point3::new(
            a.x.min(b.x).min(c.x),
            a.y.min(b.y).min(c.y),
            a.z.min(b.z).min(c.z),
        );
        let max = Point3::new(
            a.x.max(b.x).max(c.x),
            a.y.max(b.y).max(c.y),
            a.z.max(b.z).max(c.z),
        );

        let samples = |lo: f64, hi: f64| -> Vec<f64> {
            let len = (hi - lo).max(0.0);
            tile_axis(len, s)
                .into_iter()
                .map(|v| v + (lo + hi) / 2.0)
                .collect()
        };

        for &x in &samples(min.x, max.x) {
            for &y in &samples(min.y, max.y) {
                for &z in &samples(min.z, max.z) {
                    let p = Point3::new(x, y, z);
                    if (p - a).dot(&normal).abs() < radius {
                        centers.push(p);
                    }
                }
            }
        }
    }
    Ok(centers)
}
