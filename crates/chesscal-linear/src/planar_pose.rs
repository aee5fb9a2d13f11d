use chesscal_core::{Iso3, Mat3, Vec3};
use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseError {
    #[error("camera matrix is not invertible")]
    SingularK,
    #[error("homography columns vanish, cannot recover a pose")]
    VanishingColumns,
    #[error("svd failed while orthogonalizing the rotation")]
    SvdFailed,
}

/// Decompose a plane-to-image homography into the board pose, given the
/// camera matrix K.
///
/// For the `Z = 0` target plane, `H ~ K [r1 r2 t]`; the first two columns of
/// `K^-1 H` recover the rotation columns up to scale, and the closest proper
/// rotation is found by SVD. The scale sign is chosen so the board lies in
/// front of the camera (`t.z > 0`).
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PoseError> {
    let k_inv = kmtx.try_inverse().ok_or(PoseError::SingularK)?;

    let k_inv_h1 = k_inv * hmtx.column(0);
    let k_inv_h2 = k_inv * hmtx.column(1);
    let k_inv_h3 = k_inv * hmtx.column(2);

    let norm1 = k_inv_h1.norm();
    let norm2 = k_inv_h2.norm();
    if norm1 < 1e-12 || norm2 < 1e-12 {
        return Err(PoseError::VanishingColumns);
    }

    // The homography is only defined up to sign; pick the one that puts the
    // board in front of the camera.
    let mut lambda = 2.0 / (norm1 + norm2);
    if (lambda * k_inv_h3).z < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * k_inv_h1;
    let r2 = lambda * k_inv_h2;
    let r3 = r1.cross(&r2);

    let mut r_approx = Mat3::zeros();
    r_approx.set_column(0, &r1);
    r_approx.set_column(1, &r2);
    r_approx.set_column(2, &r3);

    // Closest proper rotation (polar decomposition via SVD).
    let svd = r_approx.svd(true, true);
    let mut u = svd.u.ok_or(PoseError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PoseError::SvdFailed)?;
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    let r_orth = u * v_t;

    let t_vec: Vec3 = lambda * k_inv_h3;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Iso3::from_parts(Translation3::from(t_vec), rot))
}
