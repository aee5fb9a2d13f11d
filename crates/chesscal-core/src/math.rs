//! Linear algebra type aliases shared across the workspace.

use nalgebra::{Isometry3, Matrix3, Point2, Point3, Vector2, Vector3};

/// Scalar type used throughout the workspace.
pub type Real = f64;

/// 2D point (pixel or normalized sensor coordinates).
pub type Pt2 = Point2<Real>;
/// 3D point (target or camera frame).
pub type Pt3 = Point3<Real>;
/// 2D vector.
pub type Vec2 = Vector2<Real>;
/// 3D vector.
pub type Vec3 = Vector3<Real>;
/// 3x3 matrix (intrinsics, homographies, rotations).
pub type Mat3 = Matrix3<Real>;
/// Rigid transform mapping target coordinates into the camera frame.
pub type Iso3 = Isometry3<Real>;
