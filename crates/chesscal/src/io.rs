use std::path::{Path, PathBuf};

use chesscal_core::{FrameSize, Pt2};
use image::GrayImage;
use rayon::prelude::*;
use thiserror::Error;

use crate::detect::PatternDetector;

/// File extensions recognized as calibration images.
pub const RECOGNIZED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error(
        "{} is {got_w}x{got_h}, expected {want_w}x{want_h} like the rest of the batch",
        path.display()
    )]
    DimensionMismatch {
        path: PathBuf,
        want_w: u32,
        want_h: u32,
        got_w: u32,
        got_h: u32,
    },
    #[error("no calibration images found")]
    NoImages,
}

/// List recognized image files in a directory, sorted lexicographically by
/// path.
///
/// The ordering is stable and deterministic, which matters downstream: it
/// decides which recovered pose corresponds to which file.
pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, ImageLoadError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| {
                    RECOGNIZED_EXTENSIONS
                        .iter()
                        .any(|r| ext.eq_ignore_ascii_case(r))
                })
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decode images to grayscale, enforcing identical dimensions across the
/// batch (the frame-size invariant of a calibration input).
pub fn load_grayscale_images<P: AsRef<Path>>(
    paths: &[P],
) -> Result<(Vec<GrayImage>, FrameSize), ImageLoadError> {
    let mut images = Vec::with_capacity(paths.len());
    let mut expected: Option<(u32, u32)> = None;

    for path in paths {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|source| ImageLoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();

        let dims = img.dimensions();
        match expected {
            None => expected = Some(dims),
            Some((want_w, want_h)) if dims != (want_w, want_h) => {
                return Err(ImageLoadError::DimensionMismatch {
                    path: path.to_path_buf(),
                    want_w,
                    want_h,
                    got_w: dims.0,
                    got_h: dims.1,
                });
            }
            Some(_) => {}
        }
        images.push(img);
    }

    let (w, h) = expected.ok_or(ImageLoadError::NoImages)?;
    Ok((images, FrameSize::new(w, h)))
}

/// Run a detector over every image concurrently.
///
/// Images carry no data dependency on each other, so detection fans out
/// across threads; results come back in input order, which is what the
/// correspondence builder assumes.
pub fn detect_all<D: PatternDetector + Sync>(
    detector: &D,
    images: &[GrayImage],
    inner_corners: (usize, usize),
) -> Vec<Option<Vec<Pt2>>> {
    images
        .par_iter()
        .map(|img| detector.find_corners(img, inner_corners))
        .collect()
}
