use chesscal_core::Pt2;
use image::GrayImage;

/// Collaborator contract for checkerboard corner detection.
///
/// Implementations locate the full interior-corner grid in one grayscale
/// image. The returned corners must be sub-pixel refined, in raster order
/// matching the world grid (row-major, same traversal direction), and
/// complete: `inner_cols * inner_rows` entries. A partially detected grid is
/// a failure, not a shorter result.
pub trait PatternDetector {
    /// `inner_corners` is `(cols - 1, rows - 1)` for a board of
    /// `cols x rows` squares. Returns `None` when the pattern is not found.
    fn find_corners(&self, image: &GrayImage, inner_corners: (usize, usize)) -> Option<Vec<Pt2>>;
}
