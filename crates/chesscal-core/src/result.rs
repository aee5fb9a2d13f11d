use serde::{Deserialize, Serialize};

use crate::camera::PinholeCamera;
use crate::math::Real;
use crate::observation::FrameSize;

/// The persisted outcome of a calibration run.
///
/// Immutable once produced. The RMS reprojection error is a derived
/// diagnostic: it is `None` on results loaded from a file, since the stored
/// representation only carries the model itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub camera: PinholeCamera,
    pub frame_size: FrameSize,
    pub rms_error: Option<Real>,
}

impl CalibrationResult {
    pub fn new(camera: PinholeCamera, frame_size: FrameSize, rms_error: Option<Real>) -> Self {
        Self {
            camera,
            frame_size,
            rms_error,
        }
    }

    /// The model parameters agree, ignoring the diagnostic RMS field.
    pub fn same_model(&self, other: &Self) -> bool {
        self.camera == other.camera && self.frame_size == other.frame_size
    }
}
