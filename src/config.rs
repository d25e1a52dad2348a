use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::drivers::{
    Microspectrometer, SpectroError, DEFAULT_INTEGRATION_TIME_US, DEFAULT_SCANS,
};
pub const CONFIG_FILE: &str = "microspec.json";
/// Startup settings, read from `microspec.json` when present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub integration_time_us: f64,
    pub scans: usize,
    pub update_interval_secs: f64,
    pub output_dir: PathBuf,
    /// Overrides the platform default SeaBreeze library name.
    pub seabreeze_library: Option<PathBuf>,
    pub simulated_pixels: usize,
}
impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            integration_time_us: DEFAULT_INTEGRATION_TIME_US,
            scans: DEFAULT_SCANS,
            update_interval_secs: 0.5,
            output_dir: PathBuf::from("."),
            seabreeze_library: None,
            simulated_pixels: 2048,
        }
    }
}
impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, SpectroError> {
        let text = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)
            .map_err(|e| SpectroError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
    pub fn load_or_default() -> Result<Self, SpectroError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            log::info!("loading settings from {CONFIG_FILE}");
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
    pub fn validate(&self) -> Result<(), SpectroError> {
        if !(self.integration_time_us.is_finite() && self.integration_time_us > 0.0) {
            return Err(SpectroError::Config(
                "integration_time_us must be positive".into(),
            ));
        }
        if self.scans == 0 {
            return Err(SpectroError::Config("scans must be at least 1".into()));
        }
        if !(self.update_interval_secs.is_finite() && self.update_interval_secs >= 0.0) {
            return Err(SpectroError::Config(
                "update_interval_secs must not be negative".into(),
            ));
        }
        if self.simulated_pixels < 2 {
            return Err(SpectroError::Config(
                "simulated_pixels must be at least 2".into(),
            ));
        }
        Ok(())
    }
    pub fn session(&self) -> Result<Microspectrometer, SpectroError> {
        Microspectrometer::new()
            .with_output_dir(&self.output_dir)
            .with_integration_time(self.integration_time_us)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "scans": 25, "output_dir": "runs" }"#).unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.scans, 25);
        assert_eq!(config.output_dir, PathBuf::from("runs"));
        assert_eq!(config.integration_time_us, DEFAULT_INTEGRATION_TIME_US);
        assert_eq!(config.update_interval_secs, 0.5);
    }
    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{ "integration_time_us": -1.0 }"#).unwrap();
        assert!(matches!(SessionConfig::load(&path), Err(SpectroError::Config(_))));
        fs::write(&path, "not json").unwrap();
        assert!(matches!(SessionConfig::load(&path), Err(SpectroError::Config(_))));
    }
    #[test]
    fn session_inherits_integration_time() {
        let config = SessionConfig {
            integration_time_us: 4000.0,
            ..SessionConfig::default()
        };
        let session = config.session().unwrap();
        assert_eq!(session.integration_time_us(), 4000.0);
        assert!(!session.is_connected());
    }
}
