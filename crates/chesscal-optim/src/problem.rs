use chesscal_core::Real;
use nalgebra::{DMatrix, DVector};

/// A nonlinear least-squares system: residual vector plus Jacobian at a
/// given parameter vector. Implementations must be pure functions of `x`
/// so residual and Jacobian evaluation can run concurrently.
pub trait LeastSquaresSystem: Sync {
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real>;
}

/// Termination settings for the damped least-squares iteration.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Iteration cap; the solver never runs longer than this.
    pub max_iters: usize,
    /// Relative cost-decrease tolerance.
    pub ftol: Real,
    /// Gradient tolerance.
    pub gtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            gtol: 1e-12,
        }
    }
}

/// What the solver did and where it stopped.
#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    pub iterations: usize,
    /// Final cost `0.5 * ||r||^2`.
    pub final_cost: Real,
    /// Whether a termination tolerance was met before the iteration cap.
    pub converged: bool,
}
