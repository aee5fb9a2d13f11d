use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use chesscal::{
    calibrate, init_with_level, save_calibration_to_path, ConstraintPolicy, CorrespondenceBuilder,
    FrameSize, GridSize, PlanarCalibration, Pt2, Real,
};

/// Checkerboard camera calibration from pre-detected corners.
#[derive(Debug, Parser)]
#[command(author, version, about = "Planar checkerboard calibration pipeline")]
struct Args {
    /// JSON file with per-image corner detections (see `DetectionsFile`).
    #[arg(long)]
    detections: PathBuf,

    /// Optional JSON constraint policy. Defaults are used if omitted.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Where to write the calibration text file.
    #[arg(long)]
    output: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn default_square_size() -> Real {
    1.0
}

/// On-disk input format: board geometry plus one entry per image, `null`
/// marking a failed detection. Corners are `[x, y]` pixel pairs in raster
/// order.
#[derive(Debug, Serialize, Deserialize)]
struct DetectionsFile {
    grid: GridSize,
    #[serde(default = "default_square_size")]
    square_size: Real,
    frame_size: FrameSize,
    views: Vec<Option<Vec<Pt2>>>,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn run(
    detections_path: &Path,
    policy_path: Option<&Path>,
    output_path: &Path,
) -> Result<PlanarCalibration, Box<dyn Error>> {
    let detections: DetectionsFile = load_json(detections_path)?;
    let policy = match policy_path {
        Some(path) => load_json::<ConstraintPolicy>(path)?,
        None => ConstraintPolicy::default(),
    };

    let input = CorrespondenceBuilder::new(detections.grid)
        .with_square_size(detections.square_size)
        .with_min_views(policy.min_views)
        .build(&detections.views, detections.frame_size)?;

    let calib = calibrate(&input, &policy)?;
    save_calibration_to_path(&calib.result(), output_path)?;

    log::info!(
        "wrote {} (rms {:.4} px, converged: {})",
        output_path.display(),
        calib.rms_error,
        calib.converged
    );
    Ok(calib)
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = init_with_level(level);

    let calib = run(
        &args.detections,
        args.policy.as_deref(),
        &args.output,
    )?;

    println!(
        "rms reprojection error: {:.6} px over {} views",
        calib.rms_error,
        calib.poses.len()
    );
    if !calib.converged {
        println!("warning: refinement stopped at the iteration cap");
    }
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
