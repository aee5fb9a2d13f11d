//! Closed-form building blocks for planar camera calibration.
//!
//! Everything here is linear algebra over known correspondences:
//! - [`dlt_homography`]: normalized DLT estimate of a plane-to-image
//!   homography,
//! - [`intrinsics_from_homographies`]: Zhang's closed-form intrinsic
//!   estimate from a set of plane homographies,
//! - [`pose_from_homography`]: decomposition of a homography into a rigid
//!   board pose given intrinsics.
//!
//! These seed the nonlinear refinement; none of them is expected to be
//! accurate on its own once lens distortion is present.

mod homography;
mod intrinsics_init;
mod planar_pose;

pub use homography::{dlt_homography, HomographyError};
pub use intrinsics_init::{intrinsics_from_homographies, InitError, IntrinsicsInit};
pub use planar_pose::{pose_from_homography, PoseError};
