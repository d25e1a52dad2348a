//! Continuous acquisition loop.
//!
//! Each cycle acquires a "current" curve without touching the history,
//! derives the displayed trace, and hands a [`MonitorFrame`] to a
//! [`SpectrumDisplay`]. Cancellation is checked between cycles only; a
//! scan in flight always completes.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use chrono::{DateTime, Local};
use ndarray::Array1;
use crate::drivers::absorbance::absorbance;
use crate::drivers::session::{Acquisition, Microspectrometer, DEFAULT_SCANS};
use crate::drivers::spectrum::SpectrumLabel;
use crate::drivers::SpectroError;
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
    /// Clears the flag so the token can drive another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorMode {
    /// Dark-corrected counts.
    Transmission,
    /// `log10(reference / current)`.
    Absorbance,
}
/// Trace drawn next to the live curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Reference,
    /// A stored record; negative indices count from the newest.
    History(isize),
}
impl Default for Comparison {
    fn default() -> Self {
        Comparison::History(-1)
    }
}
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub mode: MonitorMode,
    pub comparison: Comparison,
    pub update_interval: Duration,
    pub scans: usize,
    /// Also write every live curve to disk.
    pub save: bool,
}
impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Absorbance,
            comparison: Comparison::default(),
            update_interval: Duration::from_millis(500),
            scans: DEFAULT_SCANS,
            save: false,
        }
    }
}
#[derive(Clone, Debug)]
pub struct MonitorFrame {
    pub iteration: usize,
    pub measured_at: DateTime<Local>,
    pub mode: MonitorMode,
    pub wavelengths: Arc<Array1<f64>>,
    pub live: Array1<f64>,
    pub comparison: Array1<f64>,
}
/// Receives frames from [`Monitor::run`].
pub trait SpectrumDisplay {
    fn update(&mut self, frame: &MonitorFrame, interval: Duration);
    /// Called once when the loop ends, whatever the reason.
    fn close(&mut self) {}
}
impl<F: FnMut(&MonitorFrame)> SpectrumDisplay for F {
    fn update(&mut self, frame: &MonitorFrame, _interval: Duration) {
        self(frame)
    }
}
pub struct Monitor {
    settings: MonitorSettings,
    comparison: Array1<f64>,
    iteration: usize,
}
impl Monitor {
    /// Resolves the comparison trace up front so a bad index fails before
    /// the first acquisition.
    pub fn new(session: &Microspectrometer, settings: MonitorSettings) -> Result<Self, SpectroError> {
        if settings.scans < 1 {
            return Err(SpectroError::InvalidArgument(
                "number of scans must be at least 1".into(),
            ));
        }
        let chosen = match settings.comparison {
            Comparison::Reference => session
                .baseline(SpectrumLabel::Reference)
                .cloned()
                .ok_or_else(|| SpectroError::State("no reference set".into()))?,
            Comparison::History(index) => session.spectrum(index)?.counts().clone(),
        };
        let comparison = match settings.mode {
            MonitorMode::Transmission => chosen,
            MonitorMode::Absorbance => {
                let reference = session
                    .baseline(SpectrumLabel::Reference)
                    .ok_or_else(|| SpectroError::State("no reference set".into()))?;
                absorbance(reference, &chosen)?
            }
        };
        Ok(Self {
            settings,
            comparison,
            iteration: 0,
        })
    }
    pub fn comparison(&self) -> &Array1<f64> {
        &self.comparison
    }
    /// One acquisition cycle, without the sleep.
    pub fn next_frame(&mut self, session: &mut Microspectrometer) -> Result<MonitorFrame, SpectroError> {
        let acq = Acquisition::default()
            .with_scans(self.settings.scans)
            .stored(false)
            .saved(self.settings.save);
        let current = session.measure(SpectrumLabel::Current, &acq)?;
        let live = match self.settings.mode {
            MonitorMode::Transmission => current,
            MonitorMode::Absorbance => session.absorbance()?,
        };
        let frame = MonitorFrame {
            iteration: self.iteration,
            measured_at: session.last_run().unwrap_or_else(Local::now),
            mode: self.settings.mode,
            wavelengths: Arc::clone(session.wavelengths()),
            live,
            comparison: self.comparison.clone(),
        };
        self.iteration += 1;
        Ok(frame)
    }
    /// Loops until `cancel` fires or an acquisition fails. Returns the
    /// number of frames delivered.
    pub fn run<D: SpectrumDisplay + ?Sized>(
        &mut self,
        session: &mut Microspectrometer,
        cancel: &CancelToken,
        display: &mut D,
    ) -> Result<usize, SpectroError> {
        let interval = self.settings.update_interval;
        log::info!(
            "monitoring started: {:?}, every {:.2} s plus acquisition time",
            self.settings.mode,
            interval.as_secs_f64()
        );
        let mut delivered = 0;
        let outcome = loop {
            if cancel.is_cancelled() {
                break Ok(delivered);
            }
            match self.next_frame(session) {
                Ok(frame) => {
                    display.update(&frame, interval);
                    delivered += 1;
                }
                Err(err) => break Err(err),
            }
            if !interval.is_zero() && !cancel.is_cancelled() {
                thread::sleep(interval);
            }
        };
        display.close();
        match &outcome {
            Ok(n) => log::info!("monitoring stopped after {n} frames"),
            Err(err) => log::error!("monitoring aborted: {err}"),
        }
        outcome
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ManualSpectrometer;
    use ndarray::array;
    struct Recorder {
        frames: Vec<MonitorFrame>,
        closed: bool,
        stop_after: usize,
        cancel: CancelToken,
    }
    impl Recorder {
        fn new(stop_after: usize, cancel: &CancelToken) -> Self {
            Self {
                frames: Vec::new(),
                closed: false,
                stop_after,
                cancel: cancel.clone(),
            }
        }
    }
    impl SpectrumDisplay for Recorder {
        fn update(&mut self, frame: &MonitorFrame, _interval: Duration) {
            self.frames.push(frame.clone());
            if self.frames.len() >= self.stop_after {
                self.cancel.cancel();
            }
        }
        fn close(&mut self) {
            self.closed = true;
        }
    }
    fn fast(mode: MonitorMode, comparison: Comparison) -> MonitorSettings {
        MonitorSettings {
            mode,
            comparison,
            update_interval: Duration::ZERO,
            scans: 1,
            save: false,
        }
    }
    fn prepared(scans: Vec<Vec<f64>>) -> Microspectrometer {
        let dev = ManualSpectrometer::new(vec![400.0, 500.0, 600.0]).with_scans(scans);
        let mut session = Microspectrometer::new();
        session.connect(dev).unwrap();
        let acq = Acquisition::default().with_scans(1).saved(false);
        session.measure(SpectrumLabel::Reference, &acq).unwrap();
        session.measure(SpectrumLabel::Current, &acq).unwrap();
        session
    }
    #[test]
    fn absorbance_frames_track_live_curve() {
        let mut session = prepared(vec![
            vec![100.0, 100.0, 100.0],
            vec![100.0, 100.0, 100.0],
            vec![10.0, 10.0, 10.0],
            vec![1.0, 1.0, 1.0],
        ]);
        let cancel = CancelToken::new();
        let mut display = Recorder::new(2, &cancel);
        let mut monitor =
            Monitor::new(&session, fast(MonitorMode::Absorbance, Comparison::History(-1))).unwrap();
        assert_eq!(monitor.comparison(), &array![0.0, 0.0, 0.0]);
        let n = monitor.run(&mut session, &cancel, &mut display).unwrap();
        assert_eq!(n, 2);
        assert!(display.closed);
        assert!((display.frames[0].live[0] - 1.0).abs() < 1e-12);
        assert!((display.frames[1].live[0] - 2.0).abs() < 1e-12);
        assert_eq!(display.frames[1].iteration, 1);
        // live curves never enter the history
        assert_eq!(session.history().len(), 2);
    }
    #[test]
    fn transmission_compares_against_chosen_record() {
        let mut session = prepared(vec![
            vec![50.0, 60.0, 70.0],
            vec![5.0, 6.0, 7.0],
            vec![8.0, 8.0, 8.0],
        ]);
        let cancel = CancelToken::new();
        let mut display = Recorder::new(1, &cancel);
        let mut monitor =
            Monitor::new(&session, fast(MonitorMode::Transmission, Comparison::History(0))).unwrap();
        monitor.run(&mut session, &cancel, &mut display).unwrap();
        let frame = &display.frames[0];
        assert_eq!(frame.comparison, array![50.0, 60.0, 70.0]);
        assert_eq!(frame.live, array![8.0, 8.0, 8.0]);
        assert_eq!(frame.mode, MonitorMode::Transmission);
    }
    #[test]
    fn reference_comparison_in_absorbance_is_flat() {
        let session = prepared(vec![vec![3.0, 4.0, 5.0], vec![1.0, 1.0, 1.0]]);
        let monitor =
            Monitor::new(&session, fast(MonitorMode::Absorbance, Comparison::Reference)).unwrap();
        assert!(monitor.comparison().iter().all(|v| v.abs() < 1e-12));
    }
    #[test]
    fn pre_cancelled_token_produces_no_frames() {
        let dev = ManualSpectrometer::constant(vec![1.0], vec![1.0]);
        let probe = dev.probe();
        let mut session = Microspectrometer::new();
        session.connect(dev).unwrap();
        session
            .measure(SpectrumLabel::Current, &Acquisition::default().with_scans(1).saved(false))
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut display = Recorder::new(10, &cancel);
        let mut monitor =
            Monitor::new(&session, fast(MonitorMode::Transmission, Comparison::History(-1))).unwrap();
        assert_eq!(monitor.run(&mut session, &cancel, &mut display).unwrap(), 0);
        assert!(display.closed);
        assert_eq!(probe.reads(), 1);
    }
    #[test]
    fn device_error_ends_loop_and_closes_display() {
        let dev = ManualSpectrometer::constant(vec![1.0, 2.0], vec![4.0, 4.0]).fail_after(3);
        let mut session = Microspectrometer::new();
        session.connect(dev).unwrap();
        let acq = Acquisition::default().with_scans(1).saved(false);
        session.measure(SpectrumLabel::Reference, &acq).unwrap();
        session.measure(SpectrumLabel::Current, &acq).unwrap();
        let cancel = CancelToken::new();
        let mut display = Recorder::new(100, &cancel);
        let mut monitor =
            Monitor::new(&session, fast(MonitorMode::Absorbance, Comparison::Reference)).unwrap();
        let err = monitor.run(&mut session, &cancel, &mut display).unwrap_err();
        assert!(matches!(err, SpectroError::Device(_)));
        assert_eq!(display.frames.len(), 1);
        assert!(display.closed);
    }
    #[test]
    fn bad_comparison_fails_before_acquiring() {
        let dev = ManualSpectrometer::constant(vec![1.0], vec![1.0]);
        let probe = dev.probe();
        let mut session = Microspectrometer::new();
        session.connect(dev).unwrap();
        assert!(matches!(
            Monitor::new(&session, fast(MonitorMode::Transmission, Comparison::History(-1))),
            Err(SpectroError::Index { len: 0, .. })
        ));
        assert!(matches!(
            Monitor::new(&session, fast(MonitorMode::Absorbance, Comparison::Reference)),
            Err(SpectroError::State(_))
        ));
        assert_eq!(probe.reads(), 0);
    }
    #[test]
    fn closures_act_as_displays() {
        let mut session = prepared(vec![vec![2.0, 2.0, 2.0]]);
        let cancel = CancelToken::new();
        let mut seen = 0usize;
        let stop = cancel.clone();
        let mut display = |_: &MonitorFrame| {
            seen += 1;
            if seen == 3 {
                stop.cancel();
            }
        };
        let mut monitor =
            Monitor::new(&session, fast(MonitorMode::Transmission, Comparison::Reference)).unwrap();
        assert_eq!(monitor.run(&mut session, &cancel, &mut display).unwrap(), 3);
        assert_eq!(seen, 3);
    }
}
