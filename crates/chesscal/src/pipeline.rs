use chesscal_core::{
    CalibrationInput, CalibrationResult, ConstraintPolicy, Distortion, FrameSize, Iso3, Mat3,
    PinholeCamera, Pt2, Real,
};
use chesscal_linear::{
    dlt_homography, intrinsics_from_homographies, pose_from_homography, InitError,
};
use chesscal_optim::{solve_planar_intrinsics, ParamMask, SolveOptions};
use rayon::prelude::*;

use crate::error::CalibrationError;

/// Everything a calibration run produces.
///
/// The per-view poses are diagnostics; only [`PlanarCalibration::result`] is
/// meant to outlive the run.
#[derive(Debug, Clone)]
pub struct PlanarCalibration {
    pub camera: PinholeCamera,
    /// Board pose per surviving view, in input order.
    pub poses: Vec<Iso3>,
    pub frame_size: FrameSize,
    /// RMS reprojection error in pixels over all corners of all views.
    pub rms_error: Real,
    /// False when the refinement stopped at the iteration cap instead of a
    /// tolerance. The model is still the best iterate found; judge it by
    /// `rms_error`.
    pub converged: bool,
    /// True when the closed-form initialization was ill-conditioned
    /// (near-parallel board planes). Expect an elevated residual.
    pub init_degenerate: bool,
}

impl PlanarCalibration {
    /// The persistable subset of this run.
    pub fn result(&self) -> CalibrationResult {
        CalibrationResult::new(self.camera, self.frame_size, Some(self.rms_error))
    }
}

/// Estimate intrinsics, distortion and per-view poses from validated
/// correspondences.
///
/// Two phases: a closed-form estimate (per-view homographies, Zhang's
/// absolute-conic solution, homography decomposition for the poses) seeds a
/// joint Levenberg-Marquardt refinement over all free parameters. The run is
/// deterministic for identical input and policy.
///
/// Failure to converge within the iteration cap is *not* an error: the best
/// iterate comes back with `converged = false` so the caller can judge
/// acceptability. Degenerate geometry and non-finite solutions are errors.
pub fn calibrate(
    input: &CalibrationInput,
    policy: &ConstraintPolicy,
) -> Result<PlanarCalibration, CalibrationError> {
    let required = policy.min_views.max(2);
    if input.num_views() < required {
        return Err(CalibrationError::InsufficientViews {
            found: input.num_views(),
            required,
        });
    }

    // Phase 1: closed-form initialization. Views are independent here.
    let world2d: Vec<Pt2> = input
        .grid()
        .points()
        .iter()
        .map(|p| Pt2::new(p.x, p.y))
        .collect();

    let homographies: Vec<Mat3> = input
        .views()
        .par_iter()
        .map(|obs| dlt_homography(&world2d, obs.corners()))
        .collect::<Result<_, _>>()
        .map_err(|e| CalibrationError::DegenerateGeometry(e.to_string()))?;

    let init = intrinsics_from_homographies(&homographies).map_err(|e| match e {
        InitError::TooFewViews(found) => CalibrationError::InsufficientViews {
            found,
            required: 2,
        },
        InitError::Degenerate(msg) => CalibrationError::DegenerateGeometry(msg),
    })?;
    if init.ill_conditioned {
        log::warn!(
            "board orientations barely constrain the intrinsics; \
             expect an elevated reprojection error"
        );
    }

    let mut intr = init.intrinsics;
    if policy.fix_aspect_ratio {
        let f = 0.5 * (intr.fx + intr.fy);
        intr.fx = f;
        intr.fy = f;
    }
    if policy.fix_principal_point {
        let c = input.frame_size().center();
        intr.cx = c.x;
        intr.cy = c.y;
    }
    let seed_camera = PinholeCamera::new(intr, Distortion::default());
    log::debug!(
        "closed-form seed: fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        intr.fx,
        intr.fy,
        intr.cx,
        intr.cy
    );

    let kmtx = seed_camera.intrinsics.k_matrix();
    let seed_poses: Vec<Iso3> = homographies
        .par_iter()
        .map(|h| pose_from_homography(&kmtx, h))
        .collect::<Result<_, _>>()
        .map_err(|e| CalibrationError::DegenerateGeometry(e.to_string()))?;

    // Phase 2: joint refinement of one shared parameter vector.
    let mask = ParamMask::from_policy(policy);
    let opts = SolveOptions {
        max_iters: policy.max_iters,
        ftol: policy.ftol,
        gtol: policy.gtol,
    };
    let out = solve_planar_intrinsics(input, &seed_camera, &seed_poses, mask, &opts);
    if !out.report.converged {
        log::warn!(
            "refinement stopped at the iteration cap (cost {:.3e}); returning the best iterate",
            out.report.final_cost
        );
    }

    if !out.camera.is_finite() {
        return Err(CalibrationError::DegenerateGeometry(
            "refinement produced a non-finite camera model".into(),
        ));
    }

    let rms_error = reprojection_rms(&out.camera, &out.poses, input);
    if !rms_error.is_finite() {
        return Err(CalibrationError::DegenerateGeometry(
            "reprojection error is not finite".into(),
        ));
    }
    log::info!(
        "calibrated {} views, rms reprojection error {:.4} px",
        input.num_views(),
        rms_error
    );

    Ok(PlanarCalibration {
        camera: out.camera,
        poses: out.poses,
        frame_size: input.frame_size(),
        rms_error,
        converged: out.report.converged,
        init_degenerate: init.ill_conditioned,
    })
}

/// RMS reprojection error in pixels: `sqrt(sum ||observed - projected||^2 /
/// corner count)` over every corner of every view.
///
/// A corner that fails to project (behind the camera) contributes an
/// infinite error, which the caller treats as degenerate.
pub fn reprojection_rms(camera: &PinholeCamera, poses: &[Iso3], input: &CalibrationInput) -> Real {
    let mut sum_sq = 0.0;
    let mut count = 0usize;

    for (pose, obs) in poses.iter().zip(input.views()) {
        for (pw, observed) in input.grid().points().iter().zip(obs.corners()) {
            match camera.project_in_view(pose, pw) {
                Some(uv) => {
                    let du = observed.x - uv.x;
                    let dv = observed.y - uv.y;
                    sum_sq += du * du + dv * dv;
                }
                None => return Real::INFINITY,
            }
            count += 1;
        }
    }
    if count == 0 {
        return Real::INFINITY;
    }
    (sum_sq / count as Real).sqrt()
}
