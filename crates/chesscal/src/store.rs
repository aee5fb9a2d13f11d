use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chesscal_core::{
    CalibrationResult, CameraIntrinsics, Distortion, FrameSize, PinholeCamera, Real,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },
}

const KMTX_HEADER: &str = "Intrinsic Camera Matrix:";
const DIST_HEADER: &str = "Distortion Coefficients:";
const FRAME_HEADER: &str = "Frame Size:";

/// Write a calibration result as a flat, human-readable text block.
///
/// Floats use Rust's shortest round-trip formatting, so a later
/// [`load_calibration`] recovers them exactly. The RMS error is a derived
/// diagnostic and is not persisted.
pub fn save_calibration<W: Write>(
    result: &CalibrationResult,
    mut writer: W,
) -> Result<(), StoreError> {
    let k = result.camera.intrinsics;
    let d = result.camera.distortion;

    writeln!(writer, "{KMTX_HEADER}")?;
    writeln!(writer, "{} {} {}", k.fx, 0.0, k.cx)?;
    writeln!(writer, "{} {} {}", 0.0, k.fy, k.cy)?;
    writeln!(writer, "{} {} {}", 0.0, 0.0, 1.0)?;
    writeln!(writer, "{DIST_HEADER}")?;
    writeln!(writer, "{} {} {} {} {}", d.k1, d.k2, d.p1, d.p2, d.k3)?;
    writeln!(writer, "{FRAME_HEADER}")?;
    writeln!(
        writer,
        "{} {}",
        result.frame_size.width, result.frame_size.height
    )?;
    Ok(())
}

/// Save to a file, creating or truncating it.
pub fn save_calibration_to_path<P: AsRef<Path>>(
    result: &CalibrationResult,
    path: P,
) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_calibration(result, &mut writer)?;
    writer.flush()?;
    Ok(())
}

struct Lines {
    lines: Vec<String>,
    next: usize,
}

impl Lines {
    fn read<R: BufRead>(reader: R) -> Result<Self, StoreError> {
        let mut lines: Vec<String> = Vec::new();
        for line in reader.lines() {
            lines.push(line?);
        }
        // Trailing blank lines are tolerated, interior ones are not.
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        Ok(Self { lines, next: 0 })
    }

    /// 1-based number of the line `take` would return.
    fn line_no(&self) -> usize {
        self.next + 1
    }

    fn take(&mut self) -> Result<&str, StoreError> {
        let line = self.lines.get(self.next).ok_or(StoreError::Parse {
            line: self.next + 1,
            msg: "unexpected end of file".into(),
        })?;
        self.next += 1;
        Ok(line.trim())
    }

    fn expect_header(&mut self, header: &str) -> Result<(), StoreError> {
        let line_no = self.line_no();
        let line = self.take()?;
        if line != header {
            return Err(StoreError::Parse {
                line: line_no,
                msg: format!("expected `{header}`, found `{line}`"),
            });
        }
        Ok(())
    }

    fn take_numbers<T: std::str::FromStr>(&mut self, count: usize) -> Result<Vec<T>, StoreError> {
        let line_no = self.line_no();
        let line = self.take()?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != count {
            return Err(StoreError::Parse {
                line: line_no,
                msg: format!("expected {count} values, found {}", fields.len()),
            });
        }
        fields
            .iter()
            .map(|f| {
                f.parse::<T>().map_err(|_| StoreError::Parse {
                    line: line_no,
                    msg: format!("`{f}` is not a valid number"),
                })
            })
            .collect()
    }

    fn expect_end(&self) -> Result<(), StoreError> {
        if self.next < self.lines.len() {
            return Err(StoreError::Parse {
                line: self.next + 1,
                msg: "unexpected trailing content".into(),
            });
        }
        Ok(())
    }
}

/// Parse a calibration file written by [`save_calibration`].
///
/// Any deviation in headers, field count or order is a parse error; the
/// loaded result carries `rms_error: None`.
pub fn load_calibration<R: BufRead>(reader: R) -> Result<CalibrationResult, StoreError> {
    let mut lines = Lines::read(reader)?;

    lines.expect_header(KMTX_HEADER)?;
    let kmtx_first_line = lines.line_no();
    let mut k = [0.0 as Real; 9];
    for row in 0..3 {
        let values = lines.take_numbers::<Real>(3)?;
        k[3 * row..3 * row + 3].copy_from_slice(&values);
    }
    if k[1] != 0.0 || k[3] != 0.0 || k[6] != 0.0 || k[7] != 0.0 || k[8] != 1.0 {
        return Err(StoreError::Parse {
            line: kmtx_first_line,
            msg: "camera matrix is not an upper-triangular projection with unit scale".into(),
        });
    }

    lines.expect_header(DIST_HEADER)?;
    let d = lines.take_numbers::<Real>(5)?;

    lines.expect_header(FRAME_HEADER)?;
    let wh = lines.take_numbers::<u32>(2)?;
    lines.expect_end()?;

    let camera = PinholeCamera::new(
        CameraIntrinsics::new(k[0], k[4], k[2], k[5]),
        Distortion::from_coeffs([d[0], d[1], d[2], d[3], d[4]]),
    );
    Ok(CalibrationResult::new(
        camera,
        FrameSize::new(wh[0], wh[1]),
        None,
    ))
}

/// Load from a file.
pub fn load_calibration_from_path<P: AsRef<Path>>(path: P) -> Result<CalibrationResult, StoreError> {
    load_calibration(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> CalibrationResult {
        CalibrationResult::new(
            PinholeCamera::new(
                CameraIntrinsics::new(812.3456789012345, 812.3456789012345, 639.5, 359.5),
                Distortion {
                    k1: -0.112233445566778,
                    k2: 0.0123456789,
                    p1: 0.0,
                    p2: 0.0,
                    k3: 1e-17,
                },
            ),
            FrameSize::new(1280, 720),
            Some(0.1234),
        )
    }

    fn save_to_string(result: &CalibrationResult) -> String {
        let mut buf = Vec::new();
        save_calibration(result, &mut buf).expect("write to memory");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn round_trip_is_lossless() {
        let original = sample_result();
        let text = save_to_string(&original);
        let loaded = load_calibration(text.as_bytes()).expect("parse");

        assert!(loaded.same_model(&original));
        assert_eq!(loaded.rms_error, None);
    }

    #[test]
    fn layout_matches_the_documented_block() {
        let text = save_to_string(&sample_result());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "Intrinsic Camera Matrix:");
        assert_eq!(lines[4], "Distortion Coefficients:");
        assert_eq!(lines[6], "Frame Size:");
        assert_eq!(lines[8], "1280 720");
    }

    #[test]
    fn wrong_header_is_a_parse_error() {
        let text = save_to_string(&sample_result()).replace("Frame Size:", "Image Size:");
        let err = load_calibration(text.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 7, .. }), "{err}");
    }

    #[test]
    fn short_coefficient_line_is_a_parse_error() {
        let text = save_to_string(&sample_result());
        let broken = text.replace(
            "-0.112233445566778 0.0123456789 0 0 0.00000000000000001",
            "-0.112233445566778 0.0123456789 0 0",
        );
        assert_ne!(text, broken, "replacement must hit the coefficient line");
        let err = load_calibration(broken.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 6, .. }), "{err}");
    }

    #[test]
    fn trailing_garbage_is_a_parse_error() {
        let mut text = save_to_string(&sample_result());
        text.push_str("RMS: 0.12\n");
        let err = load_calibration(text.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 10, .. }), "{err}");
    }

    #[test]
    fn non_numeric_field_is_a_parse_error() {
        let text = save_to_string(&sample_result()).replace("1280 720", "1280 wide");
        let err = load_calibration(text.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 8, .. }), "{err}");
    }

    #[test]
    fn truncated_file_is_a_parse_error() {
        let text = save_to_string(&sample_result());
        let truncated: String = text.lines().take(5).collect::<Vec<_>>().join("\n");
        let err = load_calibration(truncated.as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }), "{err}");
    }
}
