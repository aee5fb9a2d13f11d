//! End-to-end pipeline tests on synthetic checkerboard data.

use chesscal::synthetic::{project_view, target_center, tilt_ramp_poses};
use chesscal::{
    calibrate, load_calibration_from_path, save_calibration_to_path, CalibrationError,
    CalibrationInput, CameraIntrinsics, ConstraintPolicy, CorrespondenceBuilder, Distortion,
    FrameSize, GridSize, ObservationSet, PinholeCamera, Pt2, UndistortionMap, WorldGrid,
};

const FRAME: FrameSize = FrameSize {
    width: 1280,
    height: 720,
};

/// Board of 10x7 squares: the 9x6 interior-corner grid.
const BOARD: GridSize = GridSize { cols: 10, rows: 7 };

/// Ground truth satisfying the default constraint policy.
fn ground_truth_camera() -> PinholeCamera {
    PinholeCamera::new(
        CameraIntrinsics::new(820.0, 820.0, 639.5, 359.5),
        Distortion {
            k1: -0.08,
            k2: 0.015,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
        },
    )
}

/// Noiseless corner detections of `n_views` tilted board poses.
fn synthetic_detections(camera: &PinholeCamera, n_views: usize) -> Vec<Option<Vec<Pt2>>> {
    let grid = WorldGrid::generate(BOARD, 1.0);
    let poses = tilt_ramp_poses(target_center(&grid), n_views, 0.15, 0.07, 14.0, 0.4);
    poses
        .iter()
        .map(|pose| project_view(camera, pose, &grid))
        .collect()
}

fn mirror_rows(corners: &[Pt2], cols: usize) -> Vec<Pt2> {
    corners
        .chunks(cols)
        .flat_map(|row| row.iter().rev().copied())
        .collect()
}

#[test]
fn twelve_views_calibrate_below_half_a_pixel() {
    let camera_gt = ground_truth_camera();
    let detections = synthetic_detections(&camera_gt, 12);

    let input = CorrespondenceBuilder::new(BOARD)
        .with_min_views(10)
        .build(&detections, FRAME)
        .expect("all views usable");
    assert_eq!(input.num_views(), 12);

    let calib = calibrate(&input, &ConstraintPolicy::default()).expect("calibration");

    assert!(calib.converged, "hit the iteration cap");
    assert!(!calib.init_degenerate);
    assert!(
        calib.rms_error < 0.5,
        "rms {} px on noiseless input",
        calib.rms_error
    );

    let k = calib.camera.intrinsics;
    let d = calib.camera.distortion;
    assert!((k.fx - 820.0).abs() < 1e-2, "fx = {}", k.fx);
    assert_eq!(k.fx, k.fy);
    assert_eq!(k.cx, 639.5);
    assert_eq!(k.cy, 359.5);
    assert!((d.k1 + 0.08).abs() < 1e-4, "k1 = {}", d.k1);
    assert!((d.k2 - 0.015).abs() < 1e-4, "k2 = {}", d.k2);
    assert_eq!(d.p1, 0.0);
    assert_eq!(d.p2, 0.0);
    assert_eq!(d.k3, 0.0);

    assert_eq!(calib.poses.len(), 12);
    for pose in &calib.poses {
        assert!(pose.translation.vector.z > 0.0, "board behind the camera");
    }
}

#[test]
fn rms_does_not_increase_with_a_larger_iteration_budget() {
    let detections = synthetic_detections(&ground_truth_camera(), 8);
    let input = CorrespondenceBuilder::new(BOARD)
        .build(&detections, FRAME)
        .expect("usable input");

    let short_budget = ConstraintPolicy {
        max_iters: 3,
        ..ConstraintPolicy::default()
    };
    let coarse = calibrate(&input, &short_budget).expect("coarse calibration");
    let fine = calibrate(&input, &ConstraintPolicy::default()).expect("fine calibration");

    assert!(
        fine.rms_error <= coarse.rms_error + 1e-9,
        "rms went up with more iterations: {} -> {}",
        coarse.rms_error,
        fine.rms_error
    );
}

#[test]
fn failed_and_mirrored_detections_are_absorbed() {
    let camera_gt = ground_truth_camera();
    let mut detections = synthetic_detections(&camera_gt, 8);

    let (inner_cols, _) = BOARD.inner_corners();
    let mirrored = detections[0]
        .as_ref()
        .map(|corners| mirror_rows(corners, inner_cols));
    detections[2] = None;
    detections[5] = mirrored;

    let input = CorrespondenceBuilder::new(BOARD)
        .build(&detections, FRAME)
        .expect("majority of views survives");
    assert_eq!(input.num_views(), 6);

    let calib = calibrate(&input, &ConstraintPolicy::default()).expect("calibration");
    assert!(calib.rms_error < 0.5, "rms {}", calib.rms_error);
}

#[test]
fn under_threshold_input_never_yields_a_model() {
    let detections = synthetic_detections(&ground_truth_camera(), 3);
    let partial = vec![detections[0].clone(), None, None];

    let err = CorrespondenceBuilder::new(BOARD)
        .build(&partial, FRAME)
        .unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::InsufficientViews {
            found: 1,
            required: 2
        }
    ));
}

#[test]
fn calibrate_enforces_the_view_threshold_itself() {
    let camera_gt = ground_truth_camera();
    let grid = WorldGrid::generate(BOARD, 1.0);
    let pose = tilt_ramp_poses(target_center(&grid), 1, 0.2, 0.0, 14.0, 0.0);
    let corners = project_view(&camera_gt, &pose[0], &grid).expect("visible");

    let input = CalibrationInput::new(
        grid,
        vec![ObservationSet::new(corners).expect("non-empty")],
        FRAME,
    )
    .expect("structurally valid");

    let err = calibrate(&input, &ConstraintPolicy::default()).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::InsufficientViews { found: 1, .. }
    ));
}

#[test]
fn relaxed_policy_recovers_an_anisotropic_camera() {
    // fx != fy and an off-center principal point need the free-parameter
    // path through the mask.
    let camera_gt = PinholeCamera::new(
        CameraIntrinsics::new(850.0, 810.0, 652.0, 351.0),
        Distortion {
            k1: -0.06,
            k2: 0.01,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
        },
    );
    let detections = synthetic_detections(&camera_gt, 10);
    let input = CorrespondenceBuilder::new(BOARD)
        .build(&detections, FRAME)
        .expect("usable input");

    let policy = ConstraintPolicy {
        fix_aspect_ratio: false,
        fix_principal_point: false,
        ..ConstraintPolicy::default()
    };
    let calib = calibrate(&input, &policy).expect("calibration");

    let k = calib.camera.intrinsics;
    assert!(calib.rms_error < 0.1, "rms {}", calib.rms_error);
    assert!((k.fx - 850.0).abs() < 0.1, "fx = {}", k.fx);
    assert!((k.fy - 810.0).abs() < 0.1, "fy = {}", k.fy);
    assert!((k.cx - 652.0).abs() < 0.1, "cx = {}", k.cx);
    assert!((k.cy - 351.0).abs() < 0.1, "cy = {}", k.cy);
}

#[test]
fn solved_model_round_trips_through_the_store() {
    let detections = synthetic_detections(&ground_truth_camera(), 10);
    let input = CorrespondenceBuilder::new(BOARD)
        .build(&detections, FRAME)
        .expect("usable input");
    let calib = calibrate(&input, &ConstraintPolicy::default()).expect("calibration");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("camera.txt");

    let result = calib.result();
    save_calibration_to_path(&result, &path).expect("save");
    let loaded = load_calibration_from_path(&path).expect("load");

    assert!(loaded.same_model(&result));
    assert_eq!(loaded.rms_error, None);
}

#[test]
fn undistortion_map_matches_the_solved_frame() {
    let detections = synthetic_detections(&ground_truth_camera(), 10);
    let input = CorrespondenceBuilder::new(BOARD)
        .build(&detections, FRAME)
        .expect("usable input");
    let calib = calibrate(&input, &ConstraintPolicy::default()).expect("calibration");

    let map = UndistortionMap::build(&calib.camera, calib.frame_size);
    assert_eq!(map.frame_size(), FRAME);
    assert_eq!(
        map.map_x().len(),
        FRAME.width as usize * FRAME.height as usize
    );

    // Barrel distortion (k1 < 0): border pixels sample inside the frame.
    let (sx, _) = map.at(0, FRAME.height / 2);
    assert!(sx > 0.0, "left border source x = {sx}");
}
