// Acquisition worker. Owns the session so every device call happens on one thread.
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use crate::config::SessionConfig;
use crate::drivers::{
    Acquisition, CancelToken, Microspectrometer, Monitor, MonitorFrame, MonitorSettings,
    SampleHandle, SimulatedSpectrometer, SpectroError, SpectrumDisplay, SpectrumLabel,
};
use crate::seabreeze::SeaBreezeSpectrometer;
use crate::types::*;
/// Forwards monitor frames to the GUI.
struct ChannelDisplay<'a> {
    tx: &'a Sender<SpectroMessage>,
}
impl SpectrumDisplay for ChannelDisplay<'_> {
    fn update(&mut self, frame: &MonitorFrame, _interval: Duration) {
        self.tx.send(SpectroMessage::Frame(frame.clone())).ok();
    }
    fn close(&mut self) {
        self.tx.send(SpectroMessage::Monitoring(false)).ok();
    }
}
pub struct Engine {
    session: Microspectrometer,
    config: SessionConfig,
    tx: Sender<SpectroMessage>,
    cancel: CancelToken,
    sample: Option<SampleHandle>,
}
impl Engine {
    pub fn new(
        config: SessionConfig,
        tx: Sender<SpectroMessage>,
        cancel: CancelToken,
    ) -> Result<Self, SpectroError> {
        let session = config.session()?;
        Ok(Self {
            session,
            config,
            tx,
            cancel,
            sample: None,
        })
    }
    pub fn session(&self) -> &Microspectrometer {
        &self.session
    }
    fn log(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("{msg}");
        self.tx.send(SpectroMessage::Log(msg)).ok();
    }
    /// Runs one command; errors are reported to the GUI and the log.
    pub fn dispatch(&mut self, cmd: GuiCommand) {
        if let Err(err) = self.handle(cmd) {
            log::error!("{err}");
            self.tx.send(SpectroMessage::Log(format!("❌ {err}"))).ok();
        }
    }
    fn handle(&mut self, cmd: GuiCommand) -> Result<(), SpectroError> {
        match cmd {
            GuiCommand::Connect(mode) => {
                match mode {
                    ConnectionMode::Simulation => {
                        let dev = SimulatedSpectrometer::new(self.config.simulated_pixels);
                        let sample = dev.sample_handle();
                        self.session.connect(dev)?;
                        self.sample = Some(sample);
                    }
                    ConnectionMode::Hardware => {
                        let dev = SeaBreezeSpectrometer::from_first_available(
                            self.config.seabreeze_library.as_deref(),
                        )?;
                        let found = format!("{} (serial {})", dev.model(), dev.serial_number());
                        self.session.connect(dev)?;
                        self.sample = None;
                        self.log(format!("Found {found}"));
                    }
                }
                self.tx.send(SpectroMessage::Status(true)).ok();
                self.log(format!("✅ Connected ({mode:?})"));
            }
            GuiCommand::Disconnect => {
                self.session.disconnect()?;
                self.sample = None;
                self.tx.send(SpectroMessage::Status(false)).ok();
                self.log("Disconnected");
            }
            GuiCommand::SetIntegrationTime(us) => {
                self.session.set_integration_time(us)?;
                self.log(format!("Integration time {us:.0} us"));
            }
            GuiCommand::Measure(req) => {
                let acq = Acquisition::default()
                    .with_scans(req.scans)
                    .stored(req.store)
                    .saved(req.save)
                    .with_comments(req.comments);
                let values = self.session.measure(req.label, &acq)?;
                self.tx
                    .send(SpectroMessage::Curve {
                        label: req.label,
                        wavelengths: Arc::clone(self.session.wavelengths()),
                        values,
                    })
                    .ok();
                self.publish_absorbance();
                self.publish_history();
                self.log(format!("Measured {} ({} scans)", req.label, req.scans));
            }
            GuiCommand::LoadBaseline(label, path) => {
                self.session.load_baseline(label, &path)?;
                self.publish_baseline(label);
                self.publish_absorbance();
                self.log(format!("Loaded {label} from {}", path.display()));
            }
            GuiCommand::SetBaselineFromHistory(label, index) => {
                self.session.set_baseline_from_history(label, index)?;
                self.publish_baseline(label);
                self.publish_absorbance();
                self.log(format!("{label} <- scan {index}"));
            }
            GuiCommand::StartExperiment(dir) => {
                let dir = self.session.start_new_experiment(dir.as_deref())?;
                self.log(format!("Experiment folder {}", dir.display()));
            }
            GuiCommand::SaveAll => {
                let paths = self.session.save_all_spectra()?;
                self.log(format!(
                    "Saved {} spectra to {}",
                    paths.len(),
                    self.session.output_dir().display()
                ));
            }
            GuiCommand::SaveAbsorbance(comments) => {
                let path = self.session.save_absorbance(None, &comments)?;
                self.log(format!("Saved {}", path.display()));
            }
            GuiCommand::SaveAbsorbancePlot => {
                let name = PathBuf::from(format!(
                    "UV_Vis_abs_{}.png",
                    chrono::Local::now().format("%m_%d_%Y_%H_%M_%S")
                ));
                let path = self.session.save_absorbance_plot(&name)?;
                self.log(format!("Saved {}", path.display()));
            }
            GuiCommand::StartMonitor(settings) => self.monitor(settings)?,
            GuiCommand::InsertSample(inserted) => match &self.sample {
                Some(sample) if inserted => sample.insert(),
                Some(sample) => sample.remove(),
                None => {
                    return Err(SpectroError::State(
                        "sample control is only available in simulation".into(),
                    ))
                }
            },
        }
        Ok(())
    }
    fn monitor(&mut self, settings: MonitorSettings) -> Result<(), SpectroError> {
        let mut monitor = Monitor::new(&self.session, settings)?;
        self.cancel.reset();
        self.tx.send(SpectroMessage::Monitoring(true)).ok();
        let mut display = ChannelDisplay { tx: &self.tx };
        let frames = monitor.run(&mut self.session, &self.cancel, &mut display)?;
        self.log(format!("Monitor stopped after {frames} frames"));
        Ok(())
    }
    fn publish_baseline(&self, label: SpectrumLabel) {
        if let Some(values) = self.session.baseline(label) {
            self.tx
                .send(SpectroMessage::Curve {
                    label,
                    wavelengths: Arc::clone(self.session.wavelengths()),
                    values: values.clone(),
                })
                .ok();
        }
    }
    fn publish_absorbance(&self) {
        if let Ok(values) = self.session.absorbance() {
            self.tx
                .send(SpectroMessage::Absorbance {
                    wavelengths: Arc::clone(self.session.wavelengths()),
                    values,
                })
                .ok();
        }
    }
    fn publish_history(&self) {
        let summaries = self.session.history_summaries().collect();
        self.tx.send(SpectroMessage::History(summaries)).ok();
    }
}
pub fn spawn_thread(
    config: SessionConfig,
    tx: Sender<SpectroMessage>,
    rx_cmd: Receiver<GuiCommand>,
    cancel: CancelToken,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut engine = match Engine::new(config, tx.clone(), cancel) {
            Ok(engine) => engine,
            Err(err) => {
                tx.send(SpectroMessage::Log(format!("❌ {err}"))).ok();
                return;
            }
        };
        engine.log("Acquisition engine ready.");
        // ends when the GUI drops its sender
        for cmd in rx_cmd {
            log::debug!("command: {cmd:?}");
            engine.dispatch(cmd);
        }
        if let Err(err) = engine.session.disconnect() {
            log::warn!("disconnect on shutdown failed: {err}");
        }
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{Comparison, MonitorMode};
    use std::sync::mpsc::channel;
    fn engine() -> (Engine, Receiver<SpectroMessage>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            output_dir: dir.path().to_path_buf(),
            simulated_pixels: 64,
            scans: 1,
            ..SessionConfig::default()
        };
        let (tx, rx) = channel();
        (Engine::new(config, tx, CancelToken::new()).unwrap(), rx, dir)
    }
    fn measure(label: SpectrumLabel) -> GuiCommand {
        GuiCommand::Measure(MeasureRequest {
            label,
            scans: 2,
            store: true,
            save: false,
            comments: String::new(),
        })
    }
    #[test]
    fn simulated_session_publishes_curves_and_history() {
        let (mut engine, rx, _dir) = engine();
        engine.dispatch(GuiCommand::Connect(ConnectionMode::Simulation));
        engine.dispatch(measure(SpectrumLabel::Dark));
        engine.dispatch(measure(SpectrumLabel::Reference));
        engine.dispatch(measure(SpectrumLabel::Current));
        let msgs: Vec<SpectroMessage> = rx.try_iter().collect();
        assert!(msgs.iter().any(|m| matches!(m, SpectroMessage::Status(true))));
        assert!(msgs.iter().any(|m| matches!(m, SpectroMessage::Absorbance { .. })));
        let last_history = msgs
            .iter()
            .rev()
            .find_map(|m| match m {
                SpectroMessage::History(h) => Some(h.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_history, 3);
        assert_eq!(engine.session().history().len(), 3);
    }
    #[test]
    fn failures_become_log_messages() {
        let (mut engine, rx, _dir) = engine();
        engine.dispatch(measure(SpectrumLabel::Current));
        engine.dispatch(GuiCommand::InsertSample(true));
        let errors = rx
            .try_iter()
            .filter(|m| matches!(m, SpectroMessage::Log(s) if s.starts_with('❌')))
            .count();
        assert_eq!(errors, 2);
    }
    #[test]
    fn cancelled_monitor_returns_control() {
        let (mut engine, rx, _dir) = engine();
        engine.dispatch(GuiCommand::Connect(ConnectionMode::Simulation));
        engine.dispatch(measure(SpectrumLabel::Reference));
        let cancel = engine.cancel.clone();
        // keeps firing in case the first cancel lands before the run resets the token
        let stopper = thread::spawn(move || {
            for _ in 0..20 {
                thread::sleep(Duration::from_millis(10));
                cancel.cancel();
            }
        });
        engine.dispatch(GuiCommand::StartMonitor(MonitorSettings {
            mode: MonitorMode::Transmission,
            comparison: Comparison::Reference,
            update_interval: Duration::from_millis(5),
            scans: 1,
            save: false,
        }));
        stopper.join().unwrap();
        let msgs: Vec<SpectroMessage> = rx.try_iter().collect();
        assert!(msgs.iter().any(|m| matches!(m, SpectroMessage::Frame(_))));
        assert!(matches!(
            msgs.iter().rev().find(|m| matches!(m, SpectroMessage::Monitoring(_))),
            Some(SpectroMessage::Monitoring(false))
        ));
        assert_eq!(engine.session().history().len(), 1);
    }
}
