//! Calibrate against a synthetic checkerboard and print the result.
//!
//! Run with `cargo run --example planar_synthetic -p chesscal`.

use chesscal::synthetic::{project_view, target_center, tilt_ramp_poses};
use chesscal::{
    calibrate, init_with_level, save_calibration, CameraIntrinsics, ConstraintPolicy,
    CorrespondenceBuilder, Distortion, FrameSize, GridSize, PinholeCamera, UndistortionMap,
    WorldGrid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = init_with_level(log::LevelFilter::Info);

    let board = GridSize::new(10, 7);
    let frame = FrameSize::new(1280, 720);

    let camera_gt = PinholeCamera::new(
        CameraIntrinsics::new(820.0, 820.0, 639.5, 359.5),
        Distortion {
            k1: -0.08,
            k2: 0.015,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
        },
    );

    let grid = WorldGrid::generate(board, 1.0);
    let poses = tilt_ramp_poses(target_center(&grid), 12, 0.15, 0.07, 14.0, 0.4);
    let detections: Vec<_> = poses
        .iter()
        .map(|pose| project_view(&camera_gt, pose, &grid))
        .collect();

    let input = CorrespondenceBuilder::new(board)
        .with_min_views(10)
        .build(&detections, frame)?;
    let calib = calibrate(&input, &ConstraintPolicy::default())?;

    println!(
        "recovered fx = {:.3} (truth 820), k1 = {:.5} (truth -0.08), rms = {:.2e} px",
        calib.camera.intrinsics.fx, calib.camera.distortion.k1, calib.rms_error
    );

    let map = UndistortionMap::build(&calib.camera, calib.frame_size);
    println!(
        "undistortion map: {}x{}, corner (0,0) samples from ({:.2}, {:.2})",
        map.width(),
        map.height(),
        map.at(0, 0).0,
        map.at(0, 0).1
    );

    let mut text = Vec::new();
    save_calibration(&calib.result(), &mut text)?;
    println!("--- calibration file ---\n{}", String::from_utf8(text)?);
    Ok(())
}
