// Messages between the GUI thread and the acquisition engine.
use std::path::PathBuf;
use std::sync::Arc;
use ndarray::Array1;
use crate::drivers::{MonitorFrame, MonitorSettings, SpectrumLabel, SpectrumSummary};
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}
#[derive(Clone, Debug)]
pub struct MeasureRequest {
    pub label: SpectrumLabel,
    pub scans: usize,
    pub store: bool,
    pub save: bool,
    pub comments: String,
}
// GUI -> engine
#[derive(Clone, Debug)]
pub enum GuiCommand {
    Connect(ConnectionMode),
    Disconnect,
    SetIntegrationTime(f64),
    Measure(MeasureRequest),
    LoadBaseline(SpectrumLabel, PathBuf),
    SetBaselineFromHistory(SpectrumLabel, isize),
    StartExperiment(Option<String>),
    SaveAll,
    SaveAbsorbance(String),
    SaveAbsorbancePlot,
    StartMonitor(MonitorSettings),
    // Simulation only
    InsertSample(bool),
}
// engine -> GUI
#[derive(Clone, Debug)]
pub enum SpectroMessage {
    Log(String),
    Status(bool),
    Monitoring(bool),
    /// Latest curve for a label after a measurement.
    Curve {
        label: SpectrumLabel,
        wavelengths: Arc<Array1<f64>>,
        values: Array1<f64>,
    },
    Absorbance {
        wavelengths: Arc<Array1<f64>>,
        values: Array1<f64>,
    },
    Frame(MonitorFrame),
    History(Vec<SpectrumSummary>),
}
