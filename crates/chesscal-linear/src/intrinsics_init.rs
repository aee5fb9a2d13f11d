use chesscal_core::{CameraIntrinsics, Mat3, Real};
use nalgebra::{DMatrix, SVector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("need at least 2 homographies for the closed-form estimate, got {0}")]
    TooFewViews(usize),
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Closed-form intrinsic estimate plus a conditioning signal.
#[derive(Debug, Clone, Copy)]
pub struct IntrinsicsInit {
    pub intrinsics: CameraIntrinsics,
    /// The absolute-conic system had a near-two-dimensional null space,
    /// which happens when all board planes are close to parallel. The
    /// estimate is still returned but should only serve as a refinement
    /// seed, and an elevated final residual is to be expected.
    pub ill_conditioned: bool,
}

/// The 6-vector v_ij(H) of Zhang's absolute-conic constraints.
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate the camera matrix K from plane homographies using Zhang's
/// closed-form solution.
///
/// Each homography contributes two rows of the system `V b = 0`; one extra
/// row encodes the zero-skew constraint of this camera model, which also
/// makes the two-view minimum solvable. The null vector is taken from the
/// SVD, and `B = K^-T K^-1` is unpacked into `(fx, fy, cx, cy)`.
pub fn intrinsics_from_homographies(hmtxs: &[Mat3]) -> Result<IntrinsicsInit, InitError> {
    let m = hmtxs.len();
    if m < 2 {
        return Err(InitError::TooFewViews(m));
    }

    let mut vmtx = DMatrix::<Real>::zeros(2 * m + 1, 6);
    for (k, hmtx) in hmtxs.iter().enumerate() {
        let v11 = v_ij(hmtx, 0, 0);
        let v22 = v_ij(hmtx, 1, 1);
        let v12 = v_ij(hmtx, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }
    // Zero skew: B12 = 0. Scaled up so the constraint holds against the
    // homography-sized rows above.
    let row_scale = vmtx.rows(0, 2 * m).amax().max(1.0);
    vmtx[(2 * m, 1)] = row_scale;

    // The columns of V span several orders of magnitude (pixel-squared down
    // to unit entries), which would swamp the small conic components.
    // Equilibrate each column to unit peak and undo the scaling on the
    // solution afterwards.
    let mut col_scale = [1.0 as Real; 6];
    for (j, scale) in col_scale.iter_mut().enumerate() {
        let peak = vmtx.column(j).amax();
        if peak > 0.0 {
            *scale = 1.0 / peak;
        }
    }
    for (j, scale) in col_scale.iter().enumerate() {
        let mut col = vmtx.column_mut(j);
        col *= *scale;
    }

    // Null vector of the equilibrated V via the 6x6 normal matrix, so the
    // full set of right singular vectors is available even for the two-view
    // minimum.
    let vtv = vmtx.transpose() * &vmtx;
    let svd = vtv.svd(false, true);
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| InitError::Degenerate("svd of the conic system failed".into()))?;
    let null = v_t.row(v_t.nrows() - 1);

    // Conditioning: a healthy system has exactly one near-zero singular
    // value. A second one appearing means the board orientations do not
    // constrain the conic (near-parallel planes). Values are squared here
    // relative to the raw system, hence the squared threshold.
    let sv = &svd.singular_values;
    let s_max = sv[0].max(Real::EPSILON);
    let ill_conditioned = sv.len() >= 2 && sv[sv.len() - 2] < 1e-14 * s_max;

    let b11 = null[0] * col_scale[0];
    let b12 = null[1] * col_scale[1];
    let b22 = null[2] * col_scale[2];
    let b13 = null[3] * col_scale[3];
    let b23 = null[4] * col_scale[4];
    let b33 = null[5] * col_scale[5];

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm < 1e-9 {
        return Err(InitError::Degenerate(
            "conic system is rank deficient".into(),
        ));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    if lambda / b11 <= 0.0 {
        return Err(InitError::Degenerate(
            "conic solution has an invalid sign".into(),
        ));
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let intrinsics = CameraIntrinsics::new(alpha, beta, u0, v0);
    if !intrinsics.is_finite() {
        return Err(InitError::Degenerate(
            "conic solution is not finite".into(),
        ));
    }

    Ok(IntrinsicsInit {
        intrinsics,
        ill_conditioned,
    })
}
