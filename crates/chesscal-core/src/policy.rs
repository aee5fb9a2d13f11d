use serde::{Deserialize, Serialize};

use crate::math::Real;

/// Configuration of the calibration solve.
///
/// The four constraint flags each remove parameters from the optimization
/// vector. The defaults enable all of them, which biases the solve toward a
/// low-parameter, well-conditioned model: a single focal length, principal
/// point pinned to the frame center, and `p1 = p2 = k3 = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintPolicy {
    /// Force `fx == fy` (single focal-length parameter).
    pub fix_aspect_ratio: bool,
    /// Force `p1 = p2 = 0`.
    pub zero_tangential: bool,
    /// Pin `(cx, cy)` to the frame center instead of estimating them.
    pub fix_principal_point: bool,
    /// Force `k3 = 0`.
    pub fix_k3: bool,
    /// Minimum number of usable views required to attempt a solve.
    ///
    /// Two views is the mathematical minimum for the closed-form phase;
    /// ten or more is recommended for a well-conditioned result.
    pub min_views: usize,
    /// Iteration cap for the nonlinear refinement.
    pub max_iters: usize,
    /// Relative cost-decrease tolerance for termination.
    pub ftol: Real,
    /// Gradient tolerance for termination.
    pub gtol: Real,
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self {
            fix_aspect_ratio: true,
            zero_tangential: true,
            fix_principal_point: true,
            fix_k3: true,
            min_views: 2,
            max_iters: 100,
            ftol: 1e-12,
            gtol: 1e-12,
        }
    }
}
