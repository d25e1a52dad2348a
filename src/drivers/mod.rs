// Acquisition core: device boundary, baseline session, file format, plotting.
pub mod absorbance;
pub mod device;
pub mod error;
pub mod monitor;
pub mod plot;
pub mod session;
pub mod simulated;
pub mod spectrum;
pub mod xy;
pub use absorbance::{absorbance, count_non_finite};
pub use device::{DeviceProbe, ManualSpectrometer, Spectrometer};
pub use error::SpectroError;
pub use monitor::{CancelToken, Comparison, Monitor, MonitorFrame, MonitorMode, MonitorSettings, SpectrumDisplay};
pub use plot::{render_curve_png, CurveSeries, PlotStyle};
pub use session::{Acquisition, Microspectrometer, DEFAULT_INTEGRATION_TIME_US, DEFAULT_SCANS};
pub use simulated::{SampleHandle, SimulatedSpectrometer};
pub use spectrum::{Baselines, Spectrum, SpectrumLabel, SpectrumSummary, TIMESTAMP_FORMAT};
pub use xy::{read_xy, write_xy, XyTable};
