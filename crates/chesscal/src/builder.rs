use chesscal_core::{
    CalibrationInput, FrameSize, GridSize, ObservationSet, Pt2, Real, Vec2, WorldGrid,
};

use crate::error::CalibrationError;

/// Turns raw per-image detection attempts into a validated
/// [`CalibrationInput`].
///
/// An image is excluded when the detector reported failure, when the corner
/// count does not match the grid, or when the corner ordering is
/// inconsistent with the other views; no partial correspondences are ever
/// accepted. Relative order among surviving images is preserved, so view `k`
/// of the output corresponds to the `k`-th surviving input image.
#[derive(Debug, Clone)]
pub struct CorrespondenceBuilder {
    grid_size: GridSize,
    square_size: Real,
    min_views: usize,
}

impl CorrespondenceBuilder {
    pub fn new(grid_size: GridSize) -> Self {
        Self {
            grid_size,
            square_size: 1.0,
            min_views: 2,
        }
    }

    /// Side length of one checkerboard square, in whatever metric unit the
    /// caller wants the translations expressed in. Defaults to 1.
    pub fn with_square_size(mut self, square_size: Real) -> Self {
        self.square_size = square_size;
        self
    }

    /// Minimum number of surviving views required; two is the mathematical
    /// floor and the default, ten or more makes for a well-conditioned
    /// solve.
    pub fn with_min_views(mut self, min_views: usize) -> Self {
        self.min_views = min_views;
        self
    }

    /// Pair detections with the world grid, applying the exclusion rules.
    ///
    /// `detections` holds one entry per input image, in image order; `None`
    /// marks a failed detection.
    pub fn build(
        &self,
        detections: &[Option<Vec<Pt2>>],
        frame_size: FrameSize,
    ) -> Result<CalibrationInput, CalibrationError> {
        let grid = WorldGrid::generate(self.grid_size, self.square_size);
        let (inner_cols, inner_rows) = self.grid_size.inner_corners();

        let mut surviving: Vec<(usize, &Vec<Pt2>, Real)> = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            let Some(corners) = det else {
                log::debug!("image {idx}: pattern not found, excluded");
                continue;
            };
            if corners.len() != grid.len() {
                log::debug!(
                    "image {idx}: {} corners instead of {}, excluded",
                    corners.len(),
                    grid.len()
                );
                continue;
            }
            let Some(orientation) = raster_orientation(corners, inner_cols, inner_rows) else {
                log::debug!("image {idx}: corner ordering is not raster-monotonic, excluded");
                continue;
            };
            surviving.push((idx, corners, orientation));
        }

        // Detectors occasionally hand back a mirrored or rotated corner
        // ordering for individual images. Those views would pair corners
        // with the wrong world points and silently inflate the residual, so
        // views disagreeing with the majority grid orientation are dropped.
        let positive = surviving.iter().filter(|(_, _, o)| *o > 0.0).count();
        let majority_positive = 2 * positive >= surviving.len();
        let views: Vec<ObservationSet> = surviving
            .iter()
            .filter(|(idx, _, orientation)| {
                let keep = (*orientation > 0.0) == majority_positive;
                if !keep {
                    log::debug!("image {idx}: grid orientation disagrees with majority, excluded");
                }
                keep
            })
            .map(|(_, corners, _)| ObservationSet::new((*corners).clone()))
            .collect::<Result<_, _>>()?;

        let required = self.min_views.max(2);
        if views.len() < required {
            return Err(CalibrationError::InsufficientViews {
                found: views.len(),
                required,
            });
        }

        log::info!(
            "using {} of {} images for calibration",
            views.len(),
            detections.len()
        );
        Ok(CalibrationInput::new(grid, views, frame_size)?)
    }
}

/// Check that `corners` traverse a grid in raster order and return the
/// orientation sign of the traversal (z-component of row-direction x
/// column-direction).
///
/// Every step along a row must advance in the view's dominant row
/// direction, and every step between rows in the dominant column direction;
/// otherwise the ordering cannot match the world grid and `None` is
/// returned.
fn raster_orientation(corners: &[Pt2], cols: usize, rows: usize) -> Option<Real> {
    debug_assert_eq!(corners.len(), cols * rows);
    if cols < 2 || rows < 2 {
        return Some(1.0);
    }

    let mut row_dir = Vec2::zeros();
    for r in 0..rows {
        for c in 0..cols - 1 {
            row_dir += corners[r * cols + c + 1] - corners[r * cols + c];
        }
    }
    let mut col_dir = Vec2::zeros();
    for r in 0..rows - 1 {
        for c in 0..cols {
            col_dir += corners[(r + 1) * cols + c] - corners[r * cols + c];
        }
    }

    for r in 0..rows {
        for c in 0..cols - 1 {
            let step = corners[r * cols + c + 1] - corners[r * cols + c];
            if step.dot(&row_dir) <= 0.0 {
                return None;
            }
        }
    }
    for r in 0..rows - 1 {
        for c in 0..cols {
            let step = corners[(r + 1) * cols + c] - corners[r * cols + c];
            if step.dot(&col_dir) <= 0.0 {
                return None;
            }
        }
    }

    Some(row_dir.x * col_dir.y - row_dir.y * col_dir.x)
}
