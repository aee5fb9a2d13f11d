use serde::{Deserialize, Serialize};

use crate::math::{Real, Vec2};

/// Number of fixed-point iterations used by [`Distortion::undistort`].
const UNDISTORT_ITERS: usize = 8;

/// Brown-Conrady lens distortion with three radial and two tangential terms.
///
/// Operates on normalized sensor coordinates (after perspective division,
/// before the intrinsic matrix). Coefficient order matches the common
/// `(k1, k2, p1, p2, k3)` convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: Real,
    pub k2: Real,
    pub p1: Real,
    pub p2: Real,
    pub k3: Real,
}

impl Distortion {
    /// Coefficients in `(k1, k2, p1, p2, k3)` order.
    pub fn coeffs(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Build from coefficients in `(k1, k2, p1, p2, k3)` order.
    pub fn from_coeffs(c: [Real; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    fn distort_impl(&self, x: Real, y: Real) -> (Real, Real) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Apply the forward distortion model to a normalized point.
    pub fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vec2::new(xd, yd)
    }

    /// Invert the distortion by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        for _ in 0..UNDISTORT_ITERS {
            let (xd, yd) = self.distort_impl(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vec2::new(x, y)
    }

    /// All five coefficients are finite.
    pub fn is_finite(&self) -> bool {
        self.coeffs().iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_distortion_is_a_no_op() {
        let d = Distortion::default();
        let n = Vec2::new(0.3, -0.2);
        assert_eq!(d.distort(&n), n);
        assert_eq!(d.undistort(&n), n);
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = Distortion {
            k1: -0.12,
            k2: 0.03,
            p1: 1e-3,
            p2: -5e-4,
            k3: 0.0,
        };

        for &(x, y) in &[(0.0, 0.0), (0.2, 0.1), (-0.35, 0.25), (0.4, -0.4)] {
            let n = Vec2::new(x, y);
            let back = d.undistort(&d.distort(&n));
            assert!(
                (back - n).norm() < 1e-9,
                "round trip failed for ({x}, {y}): {back:?}"
            );
        }
    }
}
