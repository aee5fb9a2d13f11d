use chesscal_core::Real;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Central-difference Jacobian of a residual function.
///
/// Columns are evaluated in parallel; the residual closure only ever reads
/// the perturbed copies, never a shared mutable state, so this is safe for
/// any pure residual. Step size per parameter is `cbrt(eps) * max(1, |x_j|)`,
/// the usual central-difference choice, and is fully deterministic.
pub fn numeric_jacobian<F>(residuals: &F, x: &DVector<Real>, residual_len: usize) -> DMatrix<Real>
where
    F: Fn(&DVector<Real>) -> DVector<Real> + Sync,
{
    let step_base = Real::EPSILON.cbrt();
    let n = x.len();

    let columns: Vec<DVector<Real>> = (0..n)
        .into_par_iter()
        .map(|j| {
            let h = step_base * x[j].abs().max(1.0);
            let mut x_plus = x.clone();
            let mut x_minus = x.clone();
            x_plus[j] += h;
            x_minus[j] -= h;
            (residuals(&x_plus) - residuals(&x_minus)) / (2.0 * h)
        })
        .collect();

    let mut jac = DMatrix::<Real>::zeros(residual_len, n);
    for (j, col) in columns.iter().enumerate() {
        jac.set_column(j, col);
    }
    jac
}
