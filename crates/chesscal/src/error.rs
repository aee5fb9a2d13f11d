use thiserror::Error;

/// Failures of a calibration run.
///
/// Per-image detection failures never show up here: they are absorbed by the
/// correspondence builder and only escalate in aggregate, once the number of
/// usable views drops below the policy threshold.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("only {found} usable views, need at least {required}")]
    InsufficientViews { found: usize, required: usize },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error(transparent)]
    Input(#[from] chesscal_core::InputError),
}
