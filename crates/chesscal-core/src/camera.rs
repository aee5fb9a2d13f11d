use serde::{Deserialize, Serialize};

use crate::distortion::Distortion;
use crate::math::{Iso3, Mat3, Pt3, Real, Vec2};

/// Pinhole intrinsics with zero skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
}

impl CameraIntrinsics {
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The 3x3 camera matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Build from a 3x3 camera matrix, ignoring the skew entry.
    pub fn from_k_matrix(k: &Mat3) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }

    /// Map normalized sensor coordinates to pixel coordinates.
    pub fn sensor_to_pixel(&self, sensor: &Vec2) -> Vec2 {
        Vec2::new(self.fx * sensor.x + self.cx, self.fy * sensor.y + self.cy)
    }

    /// Map pixel coordinates to normalized sensor coordinates.
    pub fn pixel_to_sensor(&self, pixel: &Vec2) -> Vec2 {
        Vec2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }

    pub fn is_finite(&self) -> bool {
        [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Full projection model: pinhole intrinsics plus Brown-Conrady distortion.
///
/// Projection pipeline: `pixel = K ∘ distort ∘ perspective(point)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub intrinsics: CameraIntrinsics,
    pub distortion: Distortion,
}

impl PinholeCamera {
    pub fn new(intrinsics: CameraIntrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn project_point(&self, pc: &Pt3) -> Option<Vec2> {
        if pc.z <= Real::EPSILON {
            return None;
        }
        let n = Vec2::new(pc.x / pc.z, pc.y / pc.z);
        let d = self.distortion.distort(&n);
        Some(self.intrinsics.sensor_to_pixel(&d))
    }

    /// Project a target-frame point through a pose into pixel coordinates.
    pub fn project_in_view(&self, cam_from_target: &Iso3, pw: &Pt3) -> Option<Vec2> {
        self.project_point(&cam_from_target.transform_point(pw))
    }

    /// Every intrinsic and distortion parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.intrinsics.is_finite() && self.distortion.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn k_matrix_round_trips() {
        let intr = CameraIntrinsics::new(800.0, 780.0, 640.0, 360.0);
        let back = CameraIntrinsics::from_k_matrix(&intr.k_matrix());
        assert_eq!(intr, back);
    }

    #[test]
    fn pixel_sensor_round_trips() {
        let intr = CameraIntrinsics::new(900.0, 880.0, 633.5, 355.5);
        let px = Vec2::new(123.25, 456.75);
        let back = intr.sensor_to_pixel(&intr.pixel_to_sensor(&px));
        assert_relative_eq!(back.x, px.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, px.y, epsilon = 1e-12);
    }

    #[test]
    fn undistorted_projection_matches_pinhole() {
        let cam = PinholeCamera::new(
            CameraIntrinsics::new(800.0, 800.0, 640.0, 360.0),
            Distortion::default(),
        );
        let pc = Pt3::new(0.2, -0.1, 2.0);
        let uv = cam.project_point(&pc).expect("in front of camera");
        assert_relative_eq!(uv.x, 800.0 * 0.1 + 640.0, epsilon = 1e-12);
        assert_relative_eq!(uv.y, 800.0 * -0.05 + 360.0, epsilon = 1e-12);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let cam = PinholeCamera::new(
            CameraIntrinsics::new(800.0, 800.0, 640.0, 360.0),
            Distortion::default(),
        );
        assert!(cam.project_point(&Pt3::new(0.0, 0.0, -1.0)).is_none());
        assert!(cam.project_point(&Pt3::new(0.1, 0.1, 0.0)).is_none());
    }
}
