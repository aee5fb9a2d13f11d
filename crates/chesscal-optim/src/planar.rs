//! Planar intrinsics refinement.
//!
//! One parameter vector holds the free intrinsic/distortion parameters
//! followed by a 6-parameter pose (axis-angle + translation) per view. Which
//! of the 9 canonical camera parameters `(fx, fy, cx, cy, k1, k2, p1, p2,
//! k3)` are free is a static [`ParamMask`] derived from the constraint
//! policy, so residual evaluation is uniform regardless of which flags are
//! set. Fixed parameters keep their seed values; under the aspect tie `fy`
//! mirrors `fx` instead of consuming a slot.

use chesscal_core::{
    CalibrationInput, CameraIntrinsics, ConstraintPolicy, Distortion, Iso3, PinholeCamera, Pt2,
    Pt3, Real, Vec3,
};
use nalgebra::{DMatrix, DVector, Translation3, UnitQuaternion};

use crate::backend::solve_least_squares;
use crate::numdiff::numeric_jacobian;
use crate::problem::{LeastSquaresSystem, SolveOptions, SolveReport};

/// Axis-angle rotation plus translation.
pub const POSE_DIM: usize = 6;

const CANONICAL_DIM: usize = 9;

/// Residual value substituted when a corner lands behind the camera, large
/// enough to push the iteration back into the valid region.
const PROJECTION_PENALTY: Real = 1e4;

const FX: usize = 0;
const FY: usize = 1;
const CX: usize = 2;
const CY: usize = 3;
const P1: usize = 6;
const P2: usize = 7;
const K3: usize = 8;

/// Which of the 9 canonical camera parameters the solver may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMask {
    free: [bool; CANONICAL_DIM],
    aspect_tied: bool,
}

impl ParamMask {
    /// Derive the mask from a constraint policy.
    pub fn from_policy(policy: &ConstraintPolicy) -> Self {
        let mut free = [true; CANONICAL_DIM];
        if policy.fix_aspect_ratio {
            free[FY] = false;
        }
        if policy.fix_principal_point {
            free[CX] = false;
            free[CY] = false;
        }
        if policy.zero_tangential {
            free[P1] = false;
            free[P2] = false;
        }
        if policy.fix_k3 {
            free[K3] = false;
        }
        Self {
            free,
            aspect_tied: policy.fix_aspect_ratio,
        }
    }

    /// All 9 parameters free, no tie.
    pub fn all_free() -> Self {
        Self {
            free: [true; CANONICAL_DIM],
            aspect_tied: false,
        }
    }

    pub fn is_free(&self, idx: usize) -> bool {
        self.free[idx]
    }

    pub fn aspect_tied(&self) -> bool {
        self.aspect_tied
    }

    /// Number of intrinsic/distortion slots in the parameter vector.
    pub fn free_count(&self) -> usize {
        self.free.iter().filter(|f| **f).count()
    }
}

fn canonical(camera: &PinholeCamera) -> [Real; CANONICAL_DIM] {
    let k = camera.intrinsics;
    let d = camera.distortion;
    [k.fx, k.fy, k.cx, k.cy, d.k1, d.k2, d.p1, d.p2, d.k3]
}

fn from_canonical(c: &[Real; CANONICAL_DIM]) -> PinholeCamera {
    PinholeCamera::new(
        CameraIntrinsics::new(c[0], c[1], c[2], c[3]),
        Distortion {
            k1: c[4],
            k2: c[5],
            p1: c[6],
            p2: c[7],
            k3: c[8],
        },
    )
}

fn pose_from_slice(x: &DVector<Real>, offset: usize) -> Iso3 {
    let rvec = Vec3::new(x[offset], x[offset + 1], x[offset + 2]);
    let tvec = Vec3::new(x[offset + 3], x[offset + 4], x[offset + 5]);
    Iso3::from_parts(
        Translation3::from(tvec),
        UnitQuaternion::from_scaled_axis(rvec),
    )
}

/// Reprojection residual model for all views of one planar target.
///
/// Owns a private copy of the correspondences; evaluation is a pure function
/// of the parameter vector.
pub struct PlanarIntrinsicsProblem {
    world: Vec<Pt3>,
    views: Vec<Vec<Pt2>>,
    seed: [Real; CANONICAL_DIM],
    mask: ParamMask,
}

impl PlanarIntrinsicsProblem {
    /// `seed_camera` supplies the values of every fixed parameter.
    pub fn new(input: &CalibrationInput, seed_camera: &PinholeCamera, mask: ParamMask) -> Self {
        Self {
            world: input.grid().points().to_vec(),
            views: input
                .views()
                .iter()
                .map(|v| v.corners().to_vec())
                .collect(),
            seed: canonical(seed_camera),
            mask,
        }
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// Two residual rows per corner, view-major.
    pub fn residual_len(&self) -> usize {
        2 * self.world.len() * self.views.len()
    }

    pub fn param_len(&self) -> usize {
        self.mask.free_count() + POSE_DIM * self.views.len()
    }

    /// Stack a camera and per-view poses into a parameter vector.
    pub fn pack(&self, camera: &PinholeCamera, poses: &[Iso3]) -> DVector<Real> {
        debug_assert_eq!(poses.len(), self.views.len());

        let c = canonical(camera);
        let mut x = Vec::with_capacity(self.param_len());
        for (i, value) in c.iter().enumerate() {
            if self.mask.is_free(i) {
                x.push(*value);
            }
        }
        for pose in poses {
            let rvec = pose.rotation.scaled_axis();
            let tvec = pose.translation.vector;
            x.extend_from_slice(&[rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z]);
        }
        DVector::from_vec(x)
    }

    /// Camera model at a parameter vector; fixed slots come from the seed.
    pub fn camera_at(&self, x: &DVector<Real>) -> PinholeCamera {
        let mut c = self.seed;
        let mut next = 0;
        for (i, slot) in c.iter_mut().enumerate() {
            if self.mask.is_free(i) {
                *slot = x[next];
                next += 1;
            }
        }
        if self.mask.aspect_tied() {
            c[FY] = c[FX];
        }
        from_canonical(&c)
    }

    /// Per-view poses at a parameter vector.
    pub fn poses_at(&self, x: &DVector<Real>) -> Vec<Iso3> {
        let base = self.mask.free_count();
        (0..self.views.len())
            .map(|v| pose_from_slice(x, base + POSE_DIM * v))
            .collect()
    }
}

impl LeastSquaresSystem for PlanarIntrinsicsProblem {
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let camera = self.camera_at(x);
        let base = self.mask.free_count();

        let mut r = DVector::<Real>::zeros(self.residual_len());
        let mut row = 0;
        for (v, corners) in self.views.iter().enumerate() {
            let pose = pose_from_slice(x, base + POSE_DIM * v);
            for (pw, observed) in self.world.iter().zip(corners.iter()) {
                match camera.project_in_view(&pose, pw) {
                    Some(uv) => {
                        r[row] = observed.x - uv.x;
                        r[row + 1] = observed.y - uv.y;
                    }
                    None => {
                        r[row] = PROJECTION_PENALTY;
                        r[row + 1] = PROJECTION_PENALTY;
                    }
                }
                row += 2;
            }
        }
        r
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        numeric_jacobian(
            &|xp| LeastSquaresSystem::residuals(self, xp),
            x,
            self.residual_len(),
        )
    }
}

/// Refined model, per-view poses and the solver report.
#[derive(Debug, Clone)]
pub struct PlanarSolveOutput {
    pub camera: PinholeCamera,
    pub poses: Vec<Iso3>,
    pub report: SolveReport,
}

/// Jointly refine the camera and every view pose from the given seed.
pub fn solve_planar_intrinsics(
    input: &CalibrationInput,
    seed_camera: &PinholeCamera,
    seed_poses: &[Iso3],
    mask: ParamMask,
    opts: &SolveOptions,
) -> PlanarSolveOutput {
    let problem = PlanarIntrinsicsProblem::new(input, seed_camera, mask);
    let x0 = problem.pack(seed_camera, seed_poses);

    log::debug!(
        "refining {} parameters against {} residuals over {} views",
        problem.param_len(),
        problem.residual_len(),
        problem.num_views()
    );

    let (x_opt, report) = solve_least_squares(&problem, x0, opts);

    PlanarSolveOutput {
        camera: problem.camera_at(&x_opt),
        poses: problem.poses_at(&x_opt),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chesscal_core::synthetic::{project_view, target_center, tilt_ramp_poses};
    use chesscal_core::{FrameSize, GridSize, ObservationSet, WorldGrid};

    fn constrained_camera() -> PinholeCamera {
        // Satisfies the default policy: fx == fy, principal point at the
        // center of a 1280x720 frame, p1 = p2 = k3 = 0.
        PinholeCamera::new(
            CameraIntrinsics::new(800.0, 800.0, 639.5, 359.5),
            Distortion {
                k1: -0.11,
                k2: 0.04,
                p1: 0.0,
                p2: 0.0,
                k3: 0.0,
            },
        )
    }

    fn synthetic_input(camera: &PinholeCamera, n_views: usize) -> (CalibrationInput, Vec<Iso3>) {
        let grid = WorldGrid::generate(GridSize::new(8, 6), 1.0);
        let poses = tilt_ramp_poses(target_center(&grid), n_views, 0.2, 0.12, 14.0, 0.5);

        let views: Vec<ObservationSet> = poses
            .iter()
            .map(|pose| {
                let corners = project_view(camera, pose, &grid).expect("visible");
                ObservationSet::new(corners).expect("non-empty")
            })
            .collect();

        let input =
            CalibrationInput::new(grid, views, FrameSize::new(1280, 720)).expect("valid input");
        (input, poses)
    }

    #[test]
    fn default_mask_has_three_free_camera_params() {
        let mask = ParamMask::from_policy(&ConstraintPolicy::default());
        // fx, k1, k2.
        assert_eq!(mask.free_count(), 3);
        assert!(mask.is_free(0));
        assert!(!mask.is_free(1));
        assert!(mask.aspect_tied());
    }

    #[test]
    fn pack_unpack_round_trips() {
        let camera = constrained_camera();
        let (input, poses) = synthetic_input(&camera, 3);
        let mask = ParamMask::from_policy(&ConstraintPolicy::default());
        let problem = PlanarIntrinsicsProblem::new(&input, &camera, mask);

        let x = problem.pack(&camera, &poses);
        assert_eq!(x.len(), problem.param_len());

        let cam_back = problem.camera_at(&x);
        assert_eq!(cam_back, camera);

        for (a, b) in problem.poses_at(&x).iter().zip(poses.iter()) {
            assert!((a.translation.vector - b.translation.vector).norm() < 1e-12);
            assert!(a.rotation.angle_to(&b.rotation) < 1e-12);
        }
    }

    #[test]
    fn residuals_vanish_at_the_generating_model() {
        let camera = constrained_camera();
        let (input, poses) = synthetic_input(&camera, 4);
        let mask = ParamMask::from_policy(&ConstraintPolicy::default());
        let problem = PlanarIntrinsicsProblem::new(&input, &camera, mask);

        let x = problem.pack(&camera, &poses);
        let r = LeastSquaresSystem::residuals(&problem, &x);
        assert_eq!(r.len(), problem.residual_len());
        assert!(r.amax() < 1e-9, "max residual {}", r.amax());
    }

    #[test]
    fn recovers_the_camera_from_a_perturbed_seed() {
        let camera = constrained_camera();
        let (input, poses) = synthetic_input(&camera, 5);
        let mask = ParamMask::from_policy(&ConstraintPolicy::default());

        let seed_camera = PinholeCamera::new(
            CameraIntrinsics::new(760.0, 760.0, 639.5, 359.5),
            Distortion::default(),
        );

        let out = solve_planar_intrinsics(
            &input,
            &seed_camera,
            &poses,
            mask,
            &SolveOptions::default(),
        );

        assert!(out.report.converged, "report: {:?}", out.report);
        let k = out.camera.intrinsics;
        let d = out.camera.distortion;
        assert!((k.fx - 800.0).abs() < 1e-4, "fx = {}", k.fx);
        assert_eq!(k.fx, k.fy);
        assert_eq!(k.cx, 639.5);
        assert!((d.k1 + 0.11).abs() < 1e-6, "k1 = {}", d.k1);
        assert!((d.k2 - 0.04).abs() < 1e-6, "k2 = {}", d.k2);
        assert_eq!(d.p1, 0.0);
        assert_eq!(d.k3, 0.0);
    }
}
