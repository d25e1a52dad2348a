//! Plain-text two-column spectrum files (`.xy`).
//!
//! Layout is a block of `# ` comment lines followed by one
//! `wavelength value` row per pixel, matching what `numpy.savetxt` emits.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use chrono::{DateTime, Local};
use ndarray::{Array1, ArrayView1};
use crate::drivers::SpectroError;
pub const COMMENT_MARKER: char = '#';
/// Both columns of a parsed `.xy` file.
#[derive(Clone, Debug)]
pub struct XyTable {
    pub wavelengths: Array1<f64>,
    pub values: Array1<f64>,
}
impl XyTable {
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
pub fn write_xy(
    path: &Path,
    header: &str,
    wavelengths: ArrayView1<'_, f64>,
    values: ArrayView1<'_, f64>,
) -> Result<(), SpectroError> {
    if wavelengths.len() != values.len() {
        return Err(SpectroError::LengthMismatch {
            expected: wavelengths.len(),
            actual: values.len(),
        });
    }
    let mut w = BufWriter::new(File::create(path)?);
    for line in header.lines() {
        writeln!(w, "{COMMENT_MARKER} {line}")?;
    }
    for (x, y) in wavelengths.iter().zip(values.iter()) {
        writeln!(w, "{x:.18e} {y:.18e}")?;
    }
    w.flush()?;
    log::debug!("wrote {} rows to {}", values.len(), path.display());
    Ok(())
}
pub fn read_xy(path: &Path) -> Result<XyTable, SpectroError> {
    let reader = BufReader::new(File::open(path)?);
    let mut wavelengths = Vec::new();
    let mut values = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }
        let mut cols = trimmed.split_whitespace();
        let (Some(x), Some(y)) = (cols.next(), cols.next()) else {
            return Err(SpectroError::Parse {
                line: idx + 1,
                message: "expected two numeric columns".into(),
            });
        };
        wavelengths.push(parse_value(x, idx + 1)?);
        values.push(parse_value(y, idx + 1)?);
    }
    Ok(XyTable {
        wavelengths: Array1::from(wavelengths),
        values: Array1::from(values),
    })
}
fn parse_value(token: &str, line: usize) -> Result<f64, SpectroError> {
    token.parse::<f64>().map_err(|e| SpectroError::Parse {
        line,
        message: format!("{token:?}: {e}"),
    })
}
pub fn record_filename(scan_number: usize) -> String {
    format!("Scan_{scan_number}.xy")
}
pub fn transmission_filename(at: DateTime<Local>) -> String {
    format!("UV_Vis_{}.xy", at.format("%m_%d_%Y_%H_%M_%S"))
}
pub fn absorbance_filename(at: DateTime<Local>) -> String {
    format!("UV_Vis_abs_{}.xy", at.format("%m_%d_%Y_%H_%M_%S"))
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::array;
    #[test]
    fn header_lines_are_commented_and_skipped_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.xy");
        let x = array![400.0, 500.0, 600.0];
        let y = array![0.25, 1.5, -3.0];
        write_xy(&path, "first\nsecond", x.view(), y.view()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# first");
        assert_eq!(lines[1], "# second");
        assert_eq!(lines.len(), 5);
        let table = read_xy(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.wavelengths, x);
        assert_eq!(table.values, y);
    }
    #[test]
    fn reader_accepts_tabs_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.xy");
        std::fs::write(&path, "# exported\n\n400\t1.0\t9\n500   2.0\n").unwrap();
        let table = read_xy(&path).unwrap();
        assert_eq!(table.values, array![1.0, 2.0]);
    }
    #[test]
    fn single_column_row_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xy");
        std::fs::write(&path, "# h\n400 1.0\n500\n").unwrap();
        match read_xy(&path) {
            Err(SpectroError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }
    #[test]
    fn writer_rejects_unequal_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xy");
        let err = write_xy(&path, "", array![1.0, 2.0].view(), array![1.0].view()).unwrap_err();
        assert!(matches!(
            err,
            SpectroError::LengthMismatch { expected: 2, actual: 1 }
        ));
    }
    #[test]
    fn default_filenames_follow_timestamp_pattern() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(record_filename(12), "Scan_12.xy");
        assert_eq!(transmission_filename(at), "UV_Vis_03_07_2024_09_05_02.xy");
        assert_eq!(absorbance_filename(at), "UV_Vis_abs_03_07_2024_09_05_02.xy");
    }
}
