//! Deterministic synthetic-data helpers.
//!
//! These build camera poses around a planar target and project the target
//! through a known camera, producing noiseless corner observations. Tests
//! and examples use them to fabricate datasets without an image pipeline;
//! everything here is deterministic so runs are exactly reproducible.

use nalgebra::{Translation3, UnitQuaternion};

use crate::camera::PinholeCamera;
use crate::grid::WorldGrid;
use crate::math::{Iso3, Pt2, Pt3, Real, Vec3};

/// Centroid of the grid corners, on the target plane.
pub fn target_center(grid: &WorldGrid) -> Pt3 {
    let mut acc = Vec3::zeros();
    for p in grid.points() {
        acc += p.coords;
    }
    Pt3::from(acc / grid.len() as Real)
}

/// Generate `n_views` poses that keep the target centered in front of the
/// camera while ramping the board tilt and the viewing distance.
///
/// Each view rotates the board by `tilt_start + tilt_step * i` radians about
/// the Y axis and half that about X, then translates it so `center` lands on
/// the optical axis at `dist_start + dist_step * i`. The tilt ramp guarantees
/// distinct board orientations across views, which the closed-form
/// initialization needs.
pub fn tilt_ramp_poses(
    center: Pt3,
    n_views: usize,
    tilt_start: Real,
    tilt_step: Real,
    dist_start: Real,
    dist_step: Real,
) -> Vec<Iso3> {
    (0..n_views)
        .map(|i| {
            let tilt = tilt_start + tilt_step * i as Real;
            let rot_y = UnitQuaternion::from_scaled_axis(Vec3::y() * tilt);
            let rot_x = UnitQuaternion::from_scaled_axis(Vec3::x() * (-0.5 * tilt));
            let rot = rot_y * rot_x;

            let dist = dist_start + dist_step * i as Real;
            let t = Vec3::new(0.0, 0.0, dist) - rot * center.coords;
            Iso3::from_parts(Translation3::from(t), rot)
        })
        .collect()
}

/// Project every grid corner through a pose and camera.
///
/// Returns `None` if any corner fails to project (behind the camera), so a
/// bad pose shows up as a missing view rather than a truncated one.
pub fn project_view(camera: &PinholeCamera, pose: &Iso3, grid: &WorldGrid) -> Option<Vec<Pt2>> {
    let mut pixels = Vec::with_capacity(grid.len());
    for pw in grid.points() {
        let uv = camera.project_in_view(pose, pw)?;
        pixels.push(Pt2::new(uv.x, uv.y));
    }
    Some(pixels)
}
