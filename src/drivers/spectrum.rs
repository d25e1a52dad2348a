use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use chrono::{DateTime, Local};
use ndarray::Array1;
use crate::drivers::xy;
use crate::drivers::SpectroError;
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
/// Which baseline slot an acquisition fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpectrumLabel {
    Current,
    Reference,
    Dark,
}
impl SpectrumLabel {
    pub const ALL: [SpectrumLabel; 3] = [
        SpectrumLabel::Current,
        SpectrumLabel::Reference,
        SpectrumLabel::Dark,
    ];
    pub fn as_str(self) -> &'static str {
        match self {
            SpectrumLabel::Current => "current_spectrum",
            SpectrumLabel::Reference => "reference",
            SpectrumLabel::Dark => "dark",
        }
    }
}
impl fmt::Display for SpectrumLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for SpectrumLabel {
    type Err = SpectroError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current_spectrum" | "current" => Ok(SpectrumLabel::Current),
            "reference" => Ok(SpectrumLabel::Reference),
            "dark" => Ok(SpectrumLabel::Dark),
            other => Err(SpectroError::InvalidArgument(format!(
                "unknown spectrum type {other:?}; expected current_spectrum, reference, or dark"
            ))),
        }
    }
}
/// One finished acquisition. Never mutated after it enters the history.
#[derive(Clone, Debug)]
pub struct Spectrum {
    scan_number: usize,
    integration_time_us: f64,
    measured_at: DateTime<Local>,
    wavelengths: Arc<Array1<f64>>,
    counts: Array1<f64>,
    label: SpectrumLabel,
    comments: String,
}
impl Spectrum {
    pub fn new(
        scan_number: usize,
        integration_time_us: f64,
        measured_at: DateTime<Local>,
        wavelengths: Arc<Array1<f64>>,
        counts: Array1<f64>,
        label: SpectrumLabel,
        comments: impl Into<String>,
    ) -> Result<Self, SpectroError> {
        if counts.len() != wavelengths.len() {
            return Err(SpectroError::LengthMismatch {
                expected: wavelengths.len(),
                actual: counts.len(),
            });
        }
        Ok(Self {
            scan_number,
            integration_time_us,
            measured_at,
            wavelengths,
            counts,
            label,
            comments: comments.into(),
        })
    }
    pub fn scan_number(&self) -> usize {
        self.scan_number
    }
    pub fn integration_time_us(&self) -> f64 {
        self.integration_time_us
    }
    pub fn measured_at(&self) -> DateTime<Local> {
        self.measured_at
    }
    pub fn wavelengths(&self) -> &Array1<f64> {
        &self.wavelengths
    }
    pub fn counts(&self) -> &Array1<f64> {
        &self.counts
    }
    pub fn label(&self) -> SpectrumLabel {
        self.label
    }
    pub fn comments(&self) -> &str {
        &self.comments
    }
    pub fn header(&self) -> String {
        format!(
            "Scan Number: {}\nIntegration Time: {:.2} microseconds.\nSpectrum Type: {}\nComments: {}",
            self.scan_number, self.integration_time_us, self.label, self.comments
        )
    }
    /// Writes the record to `filename`, or `Scan_<n>.xy` inside `dir`.
    pub fn save(&self, dir: &Path, filename: Option<&Path>) -> Result<PathBuf, SpectroError> {
        let path = match filename {
            Some(name) => dir.join(name),
            None => dir.join(xy::record_filename(self.scan_number)),
        };
        if path.exists() {
            log::warn!("overwriting {}", path.display());
        }
        xy::write_xy(&path, &self.header(), self.wavelengths.view(), self.counts.view())?;
        Ok(path)
    }
    pub fn summary(&self) -> SpectrumSummary {
        SpectrumSummary {
            scan_number: self.scan_number,
            measured_at: self.measured_at,
            label: self.label,
            comments: self.comments.clone(),
        }
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumSummary {
    pub scan_number: usize,
    pub measured_at: DateTime<Local>,
    pub label: SpectrumLabel,
    pub comments: String,
}
impl fmt::Display for SpectrumSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.scan_number,
            self.measured_at.format(TIMESTAMP_FORMAT),
            self.label,
            self.comments
        )
    }
}
/// The three working curves, aligned to the wavelength axis.
#[derive(Clone, Debug, Default)]
pub struct Baselines {
    pub dark: Array1<f64>,
    pub reference: Option<Array1<f64>>,
    pub current: Option<Array1<f64>>,
}
impl Baselines {
    pub fn for_axis(len: usize) -> Self {
        Self {
            dark: Array1::zeros(len),
            reference: None,
            current: None,
        }
    }
    pub fn get(&self, label: SpectrumLabel) -> Option<&Array1<f64>> {
        match label {
            SpectrumLabel::Dark => Some(&self.dark),
            SpectrumLabel::Reference => self.reference.as_ref(),
            SpectrumLabel::Current => self.current.as_ref(),
        }
    }
    pub fn set(&mut self, label: SpectrumLabel, curve: Array1<f64>) {
        match label {
            SpectrumLabel::Dark => self.dark = curve,
            SpectrumLabel::Reference => self.reference = Some(curve),
            SpectrumLabel::Current => self.current = Some(curve),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    fn axis() -> Arc<Array1<f64>> {
        Arc::new(array![400.0, 500.0, 600.0])
    }
    #[test]
    fn labels_parse_from_their_names() {
        for label in SpectrumLabel::ALL {
            assert_eq!(label.as_str().parse::<SpectrumLabel>().unwrap(), label);
        }
        assert!(matches!(
            "foo".parse::<SpectrumLabel>(),
            Err(SpectroError::InvalidArgument(_))
        ));
    }
    #[test]
    fn record_rejects_counts_of_wrong_length() {
        let err = Spectrum::new(
            0,
            1.0e5,
            Local::now(),
            axis(),
            array![1.0, 2.0],
            SpectrumLabel::Dark,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, SpectroError::LengthMismatch { expected: 3, actual: 2 }));
    }
    #[test]
    fn header_carries_record_metadata() {
        let spec = Spectrum::new(
            4,
            2500.0,
            Local::now(),
            axis(),
            array![1.0, 2.0, 3.0],
            SpectrumLabel::Reference,
            "blank cuvette",
        )
        .unwrap();
        assert_eq!(
            spec.header(),
            "Scan Number: 4\nIntegration Time: 2500.00 microseconds.\nSpectrum Type: reference\nComments: blank cuvette"
        );
    }
    #[test]
    fn save_uses_scan_number_filename_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let spec = Spectrum::new(
            7,
            1.0e5,
            Local::now(),
            axis(),
            array![1.0, 2.0, 3.0],
            SpectrumLabel::Current,
            "",
        )
        .unwrap();
        let path = spec.save(dir.path(), None).unwrap();
        assert_eq!(path, dir.path().join("Scan_7.xy"));
        let table = xy::read_xy(&path).unwrap();
        assert_eq!(table.values, array![1.0, 2.0, 3.0]);
    }
    #[test]
    fn baselines_route_by_label() {
        let mut b = Baselines::for_axis(3);
        assert_eq!(b.get(SpectrumLabel::Dark), Some(&Array1::<f64>::zeros(3)));
        assert!(b.get(SpectrumLabel::Reference).is_none());
        b.set(SpectrumLabel::Current, array![1.0, 1.0, 1.0]);
        assert_eq!(b.get(SpectrumLabel::Current), Some(&array![1.0, 1.0, 1.0]));
        assert!(b.reference.is_none());
    }
}
