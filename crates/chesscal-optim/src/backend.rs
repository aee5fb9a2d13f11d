use chesscal_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

use crate::problem::{LeastSquaresSystem, SolveOptions, SolveReport};

/// Adapter exposing a [`LeastSquaresSystem`] to the `levenberg-marquardt`
/// crate's problem interface.
struct LmAdapter<'a, P: LeastSquaresSystem> {
    system: &'a P,
    params: DVector<Real>,
}

impl<P: LeastSquaresSystem> LeastSquaresProblem<Real, Dyn, Dyn> for LmAdapter<'_, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        Some(self.system.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        Some(self.system.jacobian(&self.params))
    }
}

/// Minimize `0.5 * ||residuals(x)||^2` starting from `x0`.
///
/// Always returns the best iterate found; `SolveReport::converged` tells
/// whether a tolerance was met before the iteration cap.
pub fn solve_least_squares<P: LeastSquaresSystem>(
    system: &P,
    x0: DVector<Real>,
    opts: &SolveOptions,
) -> (DVector<Real>, SolveReport) {
    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.ftol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_iters.max(1));

    let adapter = LmAdapter { system, params: x0 };
    let (adapter, report) = lm.minimize(adapter);
    let x_opt = adapter.params();

    (
        x_opt,
        SolveReport {
            iterations: report.number_of_evaluations,
            final_cost: report.objective_function,
            converged: report.termination.was_successful(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Paraboloid;

    impl LeastSquaresSystem for Paraboloid {
        fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
            DVector::from_vec(vec![x[0] - 3.0, 2.0 * (x[1] + 1.0)])
        }

        fn jacobian(&self, _x: &DVector<Real>) -> DMatrix<Real> {
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0])
        }
    }

    #[test]
    fn solves_a_trivial_quadratic() {
        let (x, report) = solve_least_squares(
            &Paraboloid,
            DVector::from_vec(vec![10.0, -7.0]),
            &SolveOptions::default(),
        );

        assert!((x[0] - 3.0).abs() < 1e-8, "x0 = {}", x[0]);
        assert!((x[1] + 1.0).abs() < 1e-8, "x1 = {}", x[1]);
        assert!(report.converged, "no convergence: {report:?}");
        assert!(report.final_cost < 1e-14);
        assert!(report.iterations > 0);
    }
}
