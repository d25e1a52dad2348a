//! Acquisition, baseline correction and live monitoring for USB UV-Vis
//! microspectrometers.
pub mod config;
pub mod drivers;
pub mod engine;
pub mod gui;
pub mod seabreeze;
pub mod types;
pub use config::SessionConfig;
pub use drivers::{Acquisition, Microspectrometer, SpectroError, SpectrumLabel};
