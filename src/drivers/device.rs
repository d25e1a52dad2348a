use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::drivers::SpectroError;
/// A connected spectrometer. Every call blocks until the hardware answers.
pub trait Spectrometer {
    /// Wavelength of each pixel, in nanometres. Fixed for the device.
    fn wavelengths(&mut self) -> Result<Vec<f64>, SpectroError>;
    /// One raw scan; same length as [`Spectrometer::wavelengths`].
    fn read_intensities(&mut self) -> Result<Vec<f64>, SpectroError>;
    fn set_integration_time_micros(&mut self, micros: f64) -> Result<(), SpectroError>;
    fn close(&mut self) -> Result<(), SpectroError>;
}
impl<S: Spectrometer + ?Sized> Spectrometer for Box<S> {
    fn wavelengths(&mut self) -> Result<Vec<f64>, SpectroError> {
        (**self).wavelengths()
    }
    fn read_intensities(&mut self) -> Result<Vec<f64>, SpectroError> {
        (**self).read_intensities()
    }
    fn set_integration_time_micros(&mut self, micros: f64) -> Result<(), SpectroError> {
        (**self).set_integration_time_micros(micros)
    }
    fn close(&mut self) -> Result<(), SpectroError> {
        (**self).close()
    }
}
/// Call counters shared between a [`ManualSpectrometer`] and the test that owns it.
#[derive(Clone, Debug, Default)]
pub struct DeviceProbe {
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    integration_times: Arc<Mutex<Vec<f64>>>,
}
impl DeviceProbe {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
    pub fn integration_times(&self) -> Vec<f64> {
        self.integration_times
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}
/// Deterministic in-memory device for tests and playback.
///
/// Queued scans are returned in order; once the queue is empty the last scan
/// repeats. A fault injected with [`ManualSpectrometer::fail_after`] turns the
/// n-th following read into a device error.
pub struct ManualSpectrometer {
    wavelengths: Vec<f64>,
    queue: VecDeque<Vec<f64>>,
    last: Option<Vec<f64>>,
    fail_after: Option<usize>,
    probe: DeviceProbe,
}
impl ManualSpectrometer {
    pub fn new(wavelengths: Vec<f64>) -> Self {
        Self {
            wavelengths,
            queue: VecDeque::new(),
            last: None,
            fail_after: None,
            probe: DeviceProbe::default(),
        }
    }
    /// A device whose every read returns `scan`.
    pub fn constant(wavelengths: Vec<f64>, scan: Vec<f64>) -> Self {
        let mut dev = Self::new(wavelengths);
        dev.last = Some(scan);
        dev
    }
    pub fn with_scans(mut self, scans: impl IntoIterator<Item = Vec<f64>>) -> Self {
        self.queue.extend(scans);
        self
    }
    pub fn fail_after(mut self, successful_reads: usize) -> Self {
        self.fail_after = Some(successful_reads);
        self
    }
    pub fn probe(&self) -> DeviceProbe {
        self.probe.clone()
    }
}
impl Spectrometer for ManualSpectrometer {
    fn wavelengths(&mut self) -> Result<Vec<f64>, SpectroError> {
        Ok(self.wavelengths.clone())
    }
    fn read_intensities(&mut self) -> Result<Vec<f64>, SpectroError> {
        let count = self.probe.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| count >= limit) {
            return Err(SpectroError::Device("simulated read failure".into()));
        }
        if let Some(scan) = self.queue.pop_front() {
            self.last = Some(scan.clone());
            return Ok(scan);
        }
        self.last
            .clone()
            .ok_or_else(|| SpectroError::Device("no scans queued".into()))
    }
    fn set_integration_time_micros(&mut self, micros: f64) -> Result<(), SpectroError> {
        if let Ok(mut log) = self.probe.integration_times.lock() {
            log.push(micros);
        }
        Ok(())
    }
    fn close(&mut self) -> Result<(), SpectroError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
