use chesscal_core::{Mat3, Pt2, Real};
use nalgebra::{DMatrix, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("svd failed")]
    SvdFailed,
    #[error("estimated homography is singular")]
    Singular,
}

/// Hartley normalization: translate to the centroid, scale so the mean
/// distance from it is sqrt(2).
fn normalizing_transform(pts: &[Pt2]) -> Mat3 {
    let n = pts.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        (2.0 as Real).sqrt() / mean_dist
    } else {
        1.0
    };
    Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply_transform(t: &Mat3, p: &Pt2) -> Pt2 {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    Pt2::new(v[0] / v[2], v[1] / v[2])
}

/// Estimate H such that `image ~ H * world` with the normalized DLT.
///
/// `world` are planar target coordinates (Z = 0 dropped), `image` pixel
/// coordinates; the two slices pair index-by-index.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if n < 4 || image.len() != n {
        return Err(HomographyError::NotEnoughPoints(n.min(image.len())));
    }

    let t_world = normalizing_transform(world);
    let t_image = normalizing_transform(image);

    let mut a = DMatrix::<Real>::zeros(2 * n, 9);
    for (i, (pw, pi)) in world.iter().zip(image.iter()).enumerate() {
        let w = apply_transform(&t_world, pw);
        let q = apply_transform(&t_image, pi);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -w.x;
        a[(r0, 1)] = -w.y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = q.x * w.x;
        a[(r0, 7)] = q.x * w.y;
        a[(r0, 8)] = q.x;

        a[(r1, 3)] = -w.x;
        a[(r1, 4)] = -w.y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = q.y * w.x;
        a[(r1, 7)] = q.y * w.y;
        a[(r1, 8)] = q.y;
    }

    // Null vector of A via the 9x9 normal matrix: its smallest-eigenvalue
    // eigenvector. The square system keeps the full set of right singular
    // vectors, which a thin SVD of the wide 2n x 9 system would not.
    let ata = a.transpose() * &a;
    let svd = ata.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let h = v_t.row(v_t.nrows() - 1);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    // Undo the normalization: H = T_img^-1 * Hn * T_world.
    let t_image_inv = t_image.try_inverse().ok_or(HomographyError::Singular)?;
    let mut h_full = t_image_inv * h_norm * t_world;

    let scale = h_full[(2, 2)];
    if scale.abs() < Real::EPSILON {
        return Err(HomographyError::Singular);
    }
    h_full /= scale;

    Ok(h_full)
}
