use chesscal_core::{FrameSize, PinholeCamera, Real, Vec2};
use rayon::prelude::*;

/// Per-pixel remap table correcting lens distortion.
///
/// Entry `(u, v)` holds the *source* pixel coordinate that a remap pass
/// should sample to fill destination pixel `(u, v)`. Derived data: rebuild
/// it whenever the camera model or frame size changes, never mutate it in
/// place. Source coordinates may fall outside the frame; the sampling
/// policy for those is the consumer's decision.
#[derive(Debug, Clone, PartialEq)]
pub struct UndistortionMap {
    width: u32,
    height: u32,
    map_x: Vec<f32>,
    map_y: Vec<f32>,
}

impl UndistortionMap {
    /// Build the map for `frame_size` from a solved camera model.
    ///
    /// For every destination pixel: back-project through the inverse
    /// intrinsics to an ideal normalized coordinate, push it through the
    /// forward distortion, and re-project through the intrinsics. Each pixel
    /// is independent; rows are computed in parallel.
    pub fn build(camera: &PinholeCamera, frame_size: FrameSize) -> Self {
        let width = frame_size.width;
        let height = frame_size.height;
        let w = width as usize;

        let rows: Vec<(Vec<f32>, Vec<f32>)> = (0..height)
            .into_par_iter()
            .map(|v| {
                let mut row_x = Vec::with_capacity(w);
                let mut row_y = Vec::with_capacity(w);
                for u in 0..width {
                    let ideal = camera
                        .intrinsics
                        .pixel_to_sensor(&Vec2::new(u as Real, v as Real));
                    let distorted = camera.distortion.distort(&ideal);
                    let src = camera.intrinsics.sensor_to_pixel(&distorted);
                    row_x.push(src.x as f32);
                    row_y.push(src.y as f32);
                }
                (row_x, row_y)
            })
            .collect();

        let mut map_x = Vec::with_capacity(w * height as usize);
        let mut map_y = Vec::with_capacity(w * height as usize);
        for (row_x, row_y) in rows {
            map_x.extend_from_slice(&row_x);
            map_y.extend_from_slice(&row_y);
        }

        Self {
            width,
            height,
            map_x,
            map_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Source X coordinates, row-major, one per destination pixel.
    pub fn map_x(&self) -> &[f32] {
        &self.map_x
    }

    /// Source Y coordinates, row-major, one per destination pixel.
    pub fn map_y(&self) -> &[f32] {
        &self.map_y
    }

    /// Source coordinate for destination pixel `(u, v)`.
    pub fn at(&self, u: u32, v: u32) -> (f32, f32) {
        let idx = v as usize * self.width as usize + u as usize;
        (self.map_x[idx], self.map_y[idx])
    }
}
