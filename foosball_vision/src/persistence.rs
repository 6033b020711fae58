// THEORY:
// The `persistence` module writes the final trajectory for downstream tools and
// reads it back.
//
// The trajectory file is a two-column CSV with the header `x,y` and one row per
// trajectory entry. Coordinates are ROI-local pixels, which only mean something
// together with the ROI they were measured in. `CalibrationRecord` captures that
// ROI and the frame size next to the CSV, as a versioned JSON sidecar, so that a
// consumer can map positions back to the table without knowing the crop rule.

use crate::core_modules::candidate::Position;
use crate::core_modules::region::Region;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CSV_HEADER: &str = "x,y";

/// Current layout version of the calibration sidecar.
pub const CALIBRATION_VERSION: u32 = 1;

/// Writes `positions` as an `x,y` table.
pub fn write_csv<W: Write>(mut writer: W, positions: &[Position]) -> Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    for position in positions {
        writeln!(writer, "{},{}", position.x, position.y)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(path: impl AsRef<Path>, positions: &[Position]) -> Result<()> {
    let path = path.as_ref();
    write_csv(BufWriter::new(File::create(path)?), positions)?;
    info!(path = %path.display(), rows = positions.len(), "trajectory written");
    Ok(())
}

/// Parses an `x,y` table. A missing or different header and malformed rows are
/// rejected with their 1-based line number. Blank lines are skipped.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Position>> {
    let mut lines = BufReader::new(reader).lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| VisionError::Persistence("empty file, expected header `x,y`".into()))?;
    if header.trim() != CSV_HEADER {
        return Err(VisionError::Persistence(format!(
            "line 1: expected header `{CSV_HEADER}`, got `{}`",
            header.trim()
        )));
    }

    let mut positions = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        let line_number = index + 2;
        let row = line.trim();
        if row.is_empty() {
            continue;
        }
        positions.push(parse_row(row).ok_or_else(|| {
            VisionError::Persistence(format!("line {line_number}: malformed row `{row}`"))
        })?);
    }
    Ok(positions)
}

fn parse_row(row: &str) -> Option<Position> {
    let (x, y) = row.split_once(',')?;
    Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Position>> {
    read_csv(File::open(path)?)
}

/// Describes the coordinate space of a trajectory file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub version: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub roi: Region,
    pub roi_width: u32,
    pub roi_height: u32,
    pub coordinate_space: String,
}

impl CalibrationRecord {
    pub fn new(frame_width: u32, frame_height: u32, roi: Region) -> Self {
        Self {
            version: CALIBRATION_VERSION,
            frame_width,
            frame_height,
            roi,
            roi_width: roi.width(),
            roi_height: roi.height(),
            coordinate_space: "roi_pixels".to_string(),
        }
    }

    /// Maps an ROI-local position into `[0, 1]` on both axes.
    pub fn normalize(&self, position: Position) -> (f64, f64) {
        let scale = |value: i32, extent: u32| {
            if extent == 0 {
                0.0
            } else {
                (value as f64 / extent as f64).clamp(0.0, 1.0)
            }
        };
        (
            scale(position.x, self.roi_width),
            scale(position.y, self.roi_height),
        )
    }

    /// Maps an ROI-local position back into full-frame pixels.
    pub fn to_frame(&self, position: Position) -> Position {
        Position::new(
            position.x + self.roi.x0 as i32,
            position.y + self.roi.y0 as i32,
        )
    }

    /// `trajectory.csv` -> `trajectory.calibration.json`, in the same directory.
    pub fn sidecar_path(csv_path: impl AsRef<Path>) -> PathBuf {
        let csv_path = csv_path.as_ref();
        let stem = csv_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trajectory".to_string());
        csv_path.with_file_name(format!("{stem}.calibration.json"))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "calibration record written");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let record: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if record.version != CALIBRATION_VERSION {
            return Err(VisionError::Persistence(format!(
                "unsupported calibration version {}, expected {CALIBRATION_VERSION}",
                record.version
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let mut buffer = Vec::new();
        write_csv(
            &mut buffer,
            &[Position::new(100, 100), Position::new(-3, 7)],
        )
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "x,y\n100,100\n-3,7\n");
    }

    #[test]
    fn empty_trajectory_is_just_the_header() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();
        assert_eq!(buffer, b"x,y\n");
        assert!(read_csv(buffer.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn saved_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trajectory.csv");
        let positions = vec![Position::new(1, 2), Position::new(30, 40)];

        save_csv(&path, &positions).unwrap();
        assert_eq!(load_csv(&path).unwrap(), positions);
    }

    #[test]
    fn wrong_header_is_rejected() {
        let err = read_csv("cx,cy\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, VisionError::Persistence(ref m) if m.starts_with("line 1")));
        assert!(read_csv("".as_bytes()).is_err());
    }

    #[test]
    fn malformed_row_reports_its_line() {
        let err = read_csv("x,y\n1,2\n\n3;4\n".as_bytes()).unwrap_err();
        assert!(matches!(err, VisionError::Persistence(ref m) if m.starts_with("line 4")));
    }

    #[test]
    fn calibration_normalizes_against_the_roi() {
        let roi = Region {
            x0: 243,
            y0: 0,
            x1: 506,
            y1: 480,
        };
        let record = CalibrationRecord::new(640, 480, roi);
        assert_eq!((record.roi_width, record.roi_height), (263, 480));
        assert_eq!(record.normalize(Position::new(0, 240)), (0.0, 0.5));
        assert_eq!(record.normalize(Position::new(1000, -5)), (1.0, 0.0));
        assert_eq!(record.to_frame(Position::new(100, 100)), Position::new(343, 100));
    }

    #[test]
    fn calibration_sidecar_sits_next_to_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("game_01.csv");
        let sidecar = CalibrationRecord::sidecar_path(&csv);
        assert_eq!(sidecar, dir.path().join("game_01.calibration.json"));

        let record = CalibrationRecord::new(
            640,
            480,
            Region {
                x0: 243,
                y0: 0,
                x1: 506,
                y1: 480,
            },
        );
        record.save(&sidecar).unwrap();
        assert_eq!(CalibrationRecord::load(&sidecar).unwrap(), record);

        let json = std::fs::read_to_string(&sidecar).unwrap();
        assert!(json.contains("\"coordinate_space\": \"roi_pixels\""));
    }

    #[test]
    fn unknown_calibration_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.calibration.json");
        let mut record = CalibrationRecord::new(
            10,
            10,
            Region {
                x0: 0,
                y0: 0,
                x1: 10,
                y1: 10,
            },
        );
        record.version = 99;
        record.save(&path).unwrap();
        assert!(matches!(
            CalibrationRecord::load(&path),
            Err(VisionError::Persistence(_))
        ));
    }
}
