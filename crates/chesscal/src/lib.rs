//! Planar checkerboard camera calibration.
//!
//! Given corner detections from several views of a flat checkerboard, this
//! crate estimates the camera's intrinsic matrix and Brown-Conrady
//! distortion, reports the RMS reprojection error, builds per-pixel
//! undistortion maps, and persists the solved model to a plain text file.
//!
//! The pieces, in pipeline order:
//! 1. [`CorrespondenceBuilder`] pairs detections with the shared world grid,
//!    dropping failed or inconsistent views.
//! 2. [`calibrate`] runs the closed-form initialization and the joint
//!    nonlinear refinement.
//! 3. [`UndistortionMap`] turns the solved model into a remap table.
//! 4. [`save_calibration`] / [`load_calibration`] round-trip the result.
//!
//! Corner detection itself is a collaborator behind the [`PatternDetector`]
//! trait (enabled with the default `image` feature); any detector that
//! returns the full interior-corner grid in raster order plugs in.

mod builder;
mod error;
mod pipeline;
mod store;
mod undistort;

#[cfg(feature = "image")]
mod detect;
#[cfg(feature = "image")]
mod io;

pub use builder::CorrespondenceBuilder;
pub use error::CalibrationError;
pub use pipeline::{calibrate, reprojection_rms, PlanarCalibration};
pub use store::{
    load_calibration, load_calibration_from_path, save_calibration, save_calibration_to_path,
    StoreError,
};
pub use undistort::UndistortionMap;

#[cfg(feature = "image")]
pub use detect::PatternDetector;
#[cfg(feature = "image")]
pub use io::{
    detect_all, list_images, load_grayscale_images, ImageLoadError, RECOGNIZED_EXTENSIONS,
};

pub use chesscal_core::{
    init_with_level, synthetic, CalibrationInput, CalibrationResult, CameraIntrinsics,
    ConstraintPolicy, Distortion, FrameSize, GridSize, InputError, Iso3, Mat3, ObservationSet,
    PinholeCamera, Pt2, Pt3, Real, Vec2, Vec3, WorldGrid,
};
pub use chesscal_linear as linear;
pub use chesscal_optim as optim;
