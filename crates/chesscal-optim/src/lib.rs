//! Joint nonlinear refinement for planar camera calibration.
//!
//! The calibration-specific parts live in [`planar`]: the residual model,
//! the canonical 9-parameter constraint mask, and the parameter vector
//! layout. The damped least-squares iteration itself is delegated to the
//! `levenberg-marquardt` crate through a thin backend wrapper.

mod backend;
mod numdiff;
mod problem;

pub mod planar;

pub use backend::solve_least_squares;
pub use numdiff::numeric_jacobian;
pub use planar::{solve_planar_intrinsics, ParamMask, PlanarIntrinsicsProblem, PlanarSolveOutput};
pub use problem::{LeastSquaresSystem, SolveOptions, SolveReport};
