use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::{DateTime, Local};
use ndarray::Array1;
use crate::drivers::absorbance::absorbance;
use crate::drivers::plot::{render_curve_png, CurveSeries, PlotStyle};
use crate::drivers::spectrum::{Baselines, Spectrum, SpectrumLabel, SpectrumSummary};
use crate::drivers::{xy, Spectrometer, SpectroError};
pub const DEFAULT_INTEGRATION_TIME_US: f64 = 1.0e5;
pub const DEFAULT_SCANS: usize = 10;
/// Options for a single [`Microspectrometer::measure`] call.
#[derive(Clone, Debug)]
pub struct Acquisition {
    pub scans: usize,
    /// Append the result to the in-memory history.
    pub store: bool,
    /// Write the resulting baseline curve to disk.
    pub save: bool,
    pub comments: String,
    pub filename: Option<PathBuf>,
}
impl Default for Acquisition {
    fn default() -> Self {
        Self {
            scans: DEFAULT_SCANS,
            store: true,
            save: true,
            comments: String::new(),
            filename: None,
        }
    }
}
impl Acquisition {
    pub fn with_scans(mut self, scans: usize) -> Self {
        self.scans = scans;
        self
    }
    pub fn stored(mut self, store: bool) -> Self {
        self.store = store;
        self
    }
    pub fn saved(mut self, save: bool) -> Self {
        self.save = save;
        self
    }
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }
    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
/// Acquisition and baseline bookkeeping for one spectrometer.
///
/// The wavelength axis, baselines and history outlive the device handle:
/// after [`Microspectrometer::disconnect`] everything except acquisition
/// keeps working.
pub struct Microspectrometer {
    device: Option<Box<dyn Spectrometer + Send>>,
    wavelengths: Arc<Array1<f64>>,
    integration_time_us: f64,
    baselines: Baselines,
    history: Vec<Spectrum>,
    output_dir: PathBuf,
    last_run: Option<DateTime<Local>>,
}
impl Default for Microspectrometer {
    fn default() -> Self {
        Self::new()
    }
}
impl Microspectrometer {
    pub fn new() -> Self {
        Self {
            device: None,
            wavelengths: Arc::new(Array1::zeros(0)),
            integration_time_us: DEFAULT_INTEGRATION_TIME_US,
            baselines: Baselines::default(),
            history: Vec::new(),
            output_dir: PathBuf::from("."),
            last_run: None,
        }
    }
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
    /// Seeds the integration time applied on the next connect.
    pub fn with_integration_time(mut self, micros: f64) -> Result<Self, SpectroError> {
        validate_integration_time(micros)?;
        self.integration_time_us = micros;
        Ok(self)
    }
    pub fn connect<D>(&mut self, mut device: D) -> Result<(), SpectroError>
    where
        D: Spectrometer + Send + 'static,
    {
        if self.device.is_some() {
            return Err(SpectroError::State(
                "spectrometer already connected; disconnect first".into(),
            ));
        }
        let wavelengths = device.wavelengths()?;
        if wavelengths.is_empty() {
            return Err(SpectroError::Device(
                "device reported an empty wavelength axis".into(),
            ));
        }
        device.set_integration_time_micros(self.integration_time_us)?;
        if wavelengths.len() != self.wavelengths.len() {
            if !self.wavelengths.is_empty() {
                log::warn!(
                    "wavelength axis changed from {} to {} pixels; baselines reset",
                    self.wavelengths.len(),
                    wavelengths.len()
                );
            }
            self.baselines = Baselines::for_axis(wavelengths.len());
        }
        log::info!(
            "spectrometer connected: {} pixels, {:.1}-{:.1} nm, integration {:.0} us",
            wavelengths.len(),
            wavelengths.first().copied().unwrap_or_default(),
            wavelengths.last().copied().unwrap_or_default(),
            self.integration_time_us
        );
        self.wavelengths = Arc::new(Array1::from(wavelengths));
        self.device = Some(Box::new(device));
        Ok(())
    }
    pub fn disconnect(&mut self) -> Result<(), SpectroError> {
        match self.device.take() {
            Some(mut device) => {
                device.close()?;
                log::info!("spectrometer disconnected");
            }
            None => log::debug!("disconnect called without a connected spectrometer"),
        }
        Ok(())
    }
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }
    pub fn set_integration_time(&mut self, micros: f64) -> Result<(), SpectroError> {
        validate_integration_time(micros)?;
        if let Some(device) = self.device.as_mut() {
            device.set_integration_time_micros(micros)?;
        }
        self.integration_time_us = micros;
        log::info!("integration time set to {micros:.0} us");
        Ok(())
    }
    pub fn integration_time_us(&self) -> f64 {
        self.integration_time_us
    }
    /// Averages `acq.scans` dark-corrected reads into the `label` baseline.
    ///
    /// The baseline is replaced before the file is written, so a failed save
    /// still leaves the new curve in place. The history record is only
    /// appended once the save has succeeded.
    pub fn measure(
        &mut self,
        label: SpectrumLabel,
        acq: &Acquisition,
    ) -> Result<Array1<f64>, SpectroError> {
        if acq.scans < 1 {
            return Err(SpectroError::InvalidArgument(
                "number of scans must be at least 1".into(),
            ));
        }
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| SpectroError::State("no spectrometer connected".into()))?;
        let pixels = self.wavelengths.len();
        if label == SpectrumLabel::Dark {
            self.baselines.dark = Array1::zeros(pixels);
        } else if self.baselines.dark.len() != pixels {
            return Err(SpectroError::LengthMismatch {
                expected: pixels,
                actual: self.baselines.dark.len(),
            });
        }
        let mut running = Array1::<f64>::zeros(pixels);
        for scan in 0..acq.scans {
            let raw = device.read_intensities()?;
            if raw.len() != pixels {
                return Err(SpectroError::LengthMismatch {
                    expected: pixels,
                    actual: raw.len(),
                });
            }
            running += &(Array1::from(raw) - &self.baselines.dark);
            log::debug!("{label}: scan {}/{} read", scan + 1, acq.scans);
        }
        running /= acq.scans as f64;
        self.baselines.set(label, running.clone());
        let now = Local::now();
        self.last_run = Some(now);
        let record = Spectrum::new(
            self.history.len(),
            self.integration_time_us,
            now,
            Arc::clone(&self.wavelengths),
            running.clone(),
            label,
            acq.comments.clone(),
        )?;
        if acq.save {
            self.save_transmission(label, acq.filename.as_deref(), &acq.comments)?;
        }
        if acq.store {
            self.history.push(record);
        }
        Ok(running)
    }
    /// Like [`Microspectrometer::measure`], with the label given by name.
    pub fn measure_named(
        &mut self,
        label: &str,
        acq: &Acquisition,
    ) -> Result<Array1<f64>, SpectroError> {
        let label: SpectrumLabel = label.parse()?;
        self.measure(label, acq)
    }
    pub fn absorbance(&self) -> Result<Array1<f64>, SpectroError> {
        let reference = self
            .baselines
            .reference
            .as_ref()
            .ok_or_else(|| SpectroError::State("no reference set".into()))?;
        let current = self
            .baselines
            .current
            .as_ref()
            .ok_or_else(|| SpectroError::State("no current spectrum set".into()))?;
        absorbance(reference, current)
    }
    /// Replaces a baseline with the second column of a saved `.xy` file.
    pub fn load_baseline(&mut self, label: SpectrumLabel, path: &Path) -> Result<(), SpectroError> {
        if self.wavelengths.is_empty() {
            return Err(SpectroError::State(
                "no wavelength axis yet; connect a spectrometer first".into(),
            ));
        }
        let table = xy::read_xy(path)?;
        if table.len() != self.wavelengths.len() {
            return Err(SpectroError::LengthMismatch {
                expected: self.wavelengths.len(),
                actual: table.len(),
            });
        }
        log::info!("{label} loaded from {}", path.display());
        self.baselines.set(label, table.values);
        Ok(())
    }
    /// Copies the counts of a stored record into a baseline. Negative
    /// indices count back from the newest record.
    pub fn set_baseline_from_history(
        &mut self,
        label: SpectrumLabel,
        index: isize,
    ) -> Result<(), SpectroError> {
        let counts = self.spectrum(index)?.counts().clone();
        if counts.len() != self.wavelengths.len() {
            return Err(SpectroError::LengthMismatch {
                expected: self.wavelengths.len(),
                actual: counts.len(),
            });
        }
        self.baselines.set(label, counts);
        Ok(())
    }
    pub fn spectrum(&self, index: isize) -> Result<&Spectrum, SpectroError> {
        let len = self.history.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(SpectroError::Index { index, len });
        }
        Ok(&self.history[resolved as usize])
    }
    pub fn history(&self) -> &[Spectrum] {
        &self.history
    }
    pub fn history_summaries(&self) -> impl Iterator<Item = SpectrumSummary> + '_ {
        self.history.iter().map(Spectrum::summary)
    }
    pub fn describe_history(&self) -> String {
        let mut out = String::from("Scan\tDateTime\tSpectrumType\tComment\n");
        for summary in self.history_summaries() {
            out.push_str(&summary.to_string());
            out.push('\n');
        }
        out
    }
    pub fn baselines(&self) -> &Baselines {
        &self.baselines
    }
    pub fn baseline(&self, label: SpectrumLabel) -> Option<&Array1<f64>> {
        self.baselines.get(label)
    }
    pub fn wavelengths(&self) -> &Arc<Array1<f64>> {
        &self.wavelengths
    }
    pub fn last_run(&self) -> Option<DateTime<Local>> {
        self.last_run
    }
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    /// Creates `directory` (default: today as `MMDDYYYY`) under the output
    /// directory and sends all further default-named files there.
    pub fn start_new_experiment(&mut self, directory: Option<&str>) -> Result<PathBuf, SpectroError> {
        let name = match directory {
            Some(d) if !d.trim().is_empty() => d.to_string(),
            _ => Local::now().format("%m%d%Y").to_string(),
        };
        let dir = self.output_dir.join(name);
        fs::create_dir_all(&dir)?;
        log::info!("experiment directory: {}", dir.display());
        self.output_dir = dir.clone();
        Ok(dir)
    }
    /// Writes one baseline curve with the caller's comment as the header.
    pub fn save_transmission(
        &self,
        label: SpectrumLabel,
        filename: Option<&Path>,
        comments: &str,
    ) -> Result<PathBuf, SpectroError> {
        let curve = self
            .baselines
            .get(label)
            .ok_or_else(|| SpectroError::State(format!("no {label} curve set")))?;
        let path = self.resolve_path(filename, || xy::transmission_filename(Local::now()));
        xy::write_xy(&path, comments, self.wavelengths.view(), curve.view())?;
        log::info!("{label} saved to {}", path.display());
        Ok(path)
    }
    pub fn save_absorbance(
        &self,
        filename: Option<&Path>,
        comments: &str,
    ) -> Result<PathBuf, SpectroError> {
        let curve = self.absorbance()?;
        let path = self.resolve_path(filename, || xy::absorbance_filename(Local::now()));
        xy::write_xy(&path, comments, self.wavelengths.view(), curve.view())?;
        log::info!("absorbance saved to {}", path.display());
        Ok(path)
    }
    pub fn save_absorbance_plot(&self, filename: &Path) -> Result<PathBuf, SpectroError> {
        let curve = self.absorbance()?;
        let series = [CurveSeries::new("Absorbance", curve.view())];
        let png = render_curve_png(
            self.wavelengths.view(),
            &series,
            PlotStyle::default().with_y_label("Absorbance"),
        )?;
        let path = self.output_dir.join(filename);
        fs::write(&path, png)?;
        Ok(path)
    }
    /// Dumps every stored record as `Scan_<n>.xy`, overwriting existing files.
    pub fn save_all_spectra(&self) -> Result<Vec<PathBuf>, SpectroError> {
        self.history
            .iter()
            .map(|spectrum| spectrum.save(&self.output_dir, None))
            .collect()
    }
    fn resolve_path(&self, filename: Option<&Path>, default: impl FnOnce() -> String) -> PathBuf {
        match filename {
            Some(name) => self.output_dir.join(name),
            None => self.output_dir.join(default()),
        }
    }
}
fn validate_integration_time(micros: f64) -> Result<(), SpectroError> {
    if !micros.is_finite() || micros <= 0.0 {
        return Err(SpectroError::InvalidArgument(format!(
            "integration time must be a positive number of microseconds, got {micros}"
        )));
    }
    Ok(())
}
