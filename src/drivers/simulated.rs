use std::sync::{Arc, Mutex};
use std::time::Instant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::{Spectrometer, SpectroError};
const AXIS_START_NM: f64 = 200.0;
const AXIS_END_NM: f64 = 850.0;
const DARK_OFFSET: f64 = 120.0;
const LAMP_PEAK: f64 = 30_000.0;
const SATURATION: f64 = 65_535.0;
const REFERENCE_INTEGRATION_US: f64 = 1.0e5;
/// Lets the owner of a boxed simulator put a sample in the light path.
#[derive(Clone, Debug, Default)]
pub struct SampleHandle(Arc<Mutex<Option<Instant>>>);
impl SampleHandle {
    pub fn insert(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(Instant::now());
        }
    }
    pub fn remove(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }
    fn inserted_at(&self) -> Option<Instant> {
        self.0.lock().ok().and_then(|slot| *slot)
    }
}
/// Tungsten-halogen-ish lamp seen through a slowly darkening sample.
///
/// Counts scale with integration time and saturate like a 16-bit detector.
/// Once a sample is inserted, an absorption band near 480 nm grows over
/// time so a monitoring run has something to show.
pub struct SimulatedSpectrometer {
    wavelengths: Vec<f64>,
    integration_time_us: f64,
    noise: f64,
    sample: SampleHandle,
    rng: StdRng,
}
impl SimulatedSpectrometer {
    pub fn new(pixels: usize) -> Self {
        Self::with_rng(pixels, StdRng::from_entropy())
    }
    pub fn seeded(pixels: usize, seed: u64) -> Self {
        Self::with_rng(pixels, StdRng::seed_from_u64(seed))
    }
    fn with_rng(pixels: usize, rng: StdRng) -> Self {
        let pixels = pixels.max(2);
        let step = (AXIS_END_NM - AXIS_START_NM) / (pixels - 1) as f64;
        Self {
            wavelengths: (0..pixels).map(|i| AXIS_START_NM + i as f64 * step).collect(),
            integration_time_us: REFERENCE_INTEGRATION_US,
            noise: 15.0,
            sample: SampleHandle::default(),
            rng,
        }
    }
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }
    pub fn sample_handle(&self) -> SampleHandle {
        self.sample.clone()
    }
    fn lamp(wavelength: f64) -> f64 {
        let x = (wavelength - 600.0) / 170.0;
        LAMP_PEAK * (-x * x).exp()
    }
    fn sample_absorbance(&self, wavelength: f64) -> f64 {
        let Some(t0) = self.sample.inserted_at() else {
            return 0.0;
        };
        let depth = 0.2 + 0.02 * t0.elapsed().as_secs_f64().min(60.0);
        let x = (wavelength - 480.0) / 35.0;
        depth * (-x * x).exp()
    }
}
impl Spectrometer for SimulatedSpectrometer {
    fn wavelengths(&mut self) -> Result<Vec<f64>, SpectroError> {
        Ok(self.wavelengths.clone())
    }
    fn read_intensities(&mut self) -> Result<Vec<f64>, SpectroError> {
        let gain = self.integration_time_us / REFERENCE_INTEGRATION_US;
        let mut out = Vec::with_capacity(self.wavelengths.len());
        for &wl in &self.wavelengths {
            let transmitted = Self::lamp(wl) * 10f64.powf(-self.sample_absorbance(wl));
            let jitter = if self.noise > 0.0 {
                self.rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            out.push((DARK_OFFSET + transmitted * gain + jitter).clamp(0.0, SATURATION));
        }
        Ok(out)
    }
    fn set_integration_time_micros(&mut self, micros: f64) -> Result<(), SpectroError> {
        self.integration_time_us = micros;
        Ok(())
    }
    fn close(&mut self) -> Result<(), SpectroError> {
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn axis_spans_configured_range() {
        let mut dev = SimulatedSpectrometer::seeded(651, 1);
        let wl = dev.wavelengths().unwrap();
        assert_eq!(wl.len(), 651);
        assert!((wl[0] - AXIS_START_NM).abs() < 1e-9);
        assert!((wl[650] - AXIS_END_NM).abs() < 1e-9);
    }
    #[test]
    fn counts_scale_with_integration_time() {
        let mut dev = SimulatedSpectrometer::seeded(64, 7).with_noise(0.0);
        let base = dev.read_intensities().unwrap();
        dev.set_integration_time_micros(REFERENCE_INTEGRATION_US / 2.0).unwrap();
        let half = dev.read_intensities().unwrap();
        let peak = base.len() / 2;
        let expected = DARK_OFFSET + (base[peak] - DARK_OFFSET) / 2.0;
        assert!((half[peak] - expected).abs() < 1e-6);
    }
    #[test]
    fn inserted_sample_absorbs() {
        let mut dev = SimulatedSpectrometer::seeded(651, 3).with_noise(0.0);
        let blank = dev.read_intensities().unwrap();
        let handle = dev.sample_handle();
        handle.insert();
        let sample = dev.read_intensities().unwrap();
        // 480 nm sits at pixel 280 on a 1 nm grid starting at 200 nm.
        assert!(sample[280] < blank[280]);
        assert!((sample[640] - blank[640]).abs() < 1.0);
        handle.remove();
        assert_eq!(dev.read_intensities().unwrap(), blank);
    }
}
