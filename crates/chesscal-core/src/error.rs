use thiserror::Error;

/// Violations of the observation container invariants.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("view {view} has {got} corners, expected {expected}")]
    CornerCountMismatch {
        view: usize,
        expected: usize,
        got: usize,
    },
    #[error("observation set is empty")]
    EmptyObservation,
    #[error("calibration input has no views")]
    NoViews,
    #[error("frame size {width}x{height} is not usable")]
    BadFrameSize { width: u32, height: u32 },
}
