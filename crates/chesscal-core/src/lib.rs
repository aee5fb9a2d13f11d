//! Core types for planar checkerboard camera calibration.
//!
//! This crate is intentionally small and purely geometric. It contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Pt3`, ...),
//! - the pinhole camera model with Brown-Conrady distortion,
//! - world grid generation and observation containers,
//! - the constraint policy that drives the solver,
//! - deterministic synthetic-data helpers for tests and examples.
//!
//! It does *not* depend on any concrete corner detector or image type.

mod camera;
mod distortion;
mod error;
mod grid;
mod logger;
mod math;
mod observation;
mod policy;
mod result;

pub mod synthetic;

pub use camera::{CameraIntrinsics, PinholeCamera};
pub use distortion::Distortion;
pub use error::InputError;
pub use grid::{GridSize, WorldGrid};
pub use logger::init_with_level;
pub use math::{Iso3, Mat3, Pt2, Pt3, Real, Vec2, Vec3};
pub use observation::{CalibrationInput, FrameSize, ObservationSet};
pub use policy::ConstraintPolicy;
pub use result::CalibrationResult;
