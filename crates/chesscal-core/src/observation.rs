use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::grid::WorldGrid;
use crate::math::{Pt2, Real, Vec2};

/// Common pixel dimensions of every image that contributed to a calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Geometric center of the pixel grid, `((w-1)/2, (h-1)/2)`.
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.width as Real - 1.0) * 0.5,
            (self.height as Real - 1.0) * 0.5,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Ordered corner detections of one successfully processed image.
///
/// Corners are in raster order matching the world grid; index `k` pairs with
/// world point `k`. The set is immutable after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    corners: Vec<Pt2>,
}

impl ObservationSet {
    pub fn new(corners: Vec<Pt2>) -> Result<Self, InputError> {
        if corners.is_empty() {
            return Err(InputError::EmptyObservation);
        }
        Ok(Self { corners })
    }

    pub fn corners(&self) -> &[Pt2] {
        &self.corners
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}

/// Validated correspondences for one calibration run: the shared world grid
/// plus one observation set per surviving image, all with a common frame size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationInput {
    grid: WorldGrid,
    views: Vec<ObservationSet>,
    frame_size: FrameSize,
}

impl CalibrationInput {
    /// Pair observation sets with the world grid, enforcing the
    /// correspondence invariant: every view has exactly one corner per grid
    /// point, in matching raster order.
    pub fn new(
        grid: WorldGrid,
        views: Vec<ObservationSet>,
        frame_size: FrameSize,
    ) -> Result<Self, InputError> {
        if !frame_size.is_valid() {
            return Err(InputError::BadFrameSize {
                width: frame_size.width,
                height: frame_size.height,
            });
        }
        if views.is_empty() {
            return Err(InputError::NoViews);
        }
        for (view, obs) in views.iter().enumerate() {
            if obs.len() != grid.len() {
                return Err(InputError::CornerCountMismatch {
                    view,
                    expected: grid.len(),
                    got: obs.len(),
                });
            }
        }
        Ok(Self {
            grid,
            views,
            frame_size,
        })
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn views(&self) -> &[ObservationSet] {
        &self.views
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    /// Total corner count across all views.
    pub fn total_corners(&self) -> usize {
        self.views.iter().map(ObservationSet::len).sum()
    }
}
