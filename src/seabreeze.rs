use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_int, c_long, c_ulong};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use libloading::Library;
use once_cell::sync::OnceCell;
use crate::drivers::{Spectrometer, SpectroError};
const FIRST_DEVICE: c_int = 0;
const ERROR_STRING_LEN: usize = 128;
struct SeaBreezeApi {
    #[allow(dead_code)]
    lib: Library,
    open_spectrometer: unsafe extern "C" fn(c_int, *mut c_int) -> c_int,
    close_spectrometer: unsafe extern "C" fn(c_int, *mut c_int) -> c_int,
    get_error_string: unsafe extern "C" fn(c_int, *mut c_char, c_int) -> c_int,
    get_model: unsafe extern "C" fn(c_int, *mut c_int, *mut c_char, c_int) -> c_int,
    get_serial_number: unsafe extern "C" fn(c_int, *mut c_int, *mut c_char, c_int) -> c_int,
    set_integration_time_microsec: unsafe extern "C" fn(c_int, *mut c_int, c_ulong),
    get_min_integration_time_microsec: unsafe extern "C" fn(c_int, *mut c_int) -> c_long,
    get_formatted_spectrum_length: unsafe extern "C" fn(c_int, *mut c_int) -> c_int,
    get_formatted_spectrum: unsafe extern "C" fn(c_int, *mut c_int, *mut c_double, c_int) -> c_int,
    get_wavelengths: unsafe extern "C" fn(c_int, *mut c_int, *mut c_double, c_int) -> c_int,
}
impl SeaBreezeApi {
    fn load(path: &Path) -> Result<Self> {
        let lib = unsafe { Library::new(path) }
            .with_context(|| format!("SeaBreeze library not found at {}", path.display()))?;
        // Safety: signatures follow SeaBreezeWrapper.h from the OceanOptics SDK.
        unsafe {
            Ok(Self {
                open_spectrometer: *lib.get(b"seabreeze_open_spectrometer\0")?,
                close_spectrometer: *lib.get(b"seabreeze_close_spectrometer\0")?,
                get_error_string: *lib.get(b"seabreeze_get_error_string\0")?,
                get_model: *lib.get(b"seabreeze_get_model\0")?,
                get_serial_number: *lib.get(b"seabreeze_get_serial_number\0")?,
                set_integration_time_microsec: *lib
                    .get(b"seabreeze_set_integration_time_microsec\0")?,
                get_min_integration_time_microsec: *lib
                    .get(b"seabreeze_get_min_integration_time_microsec\0")?,
                get_formatted_spectrum_length: *lib
                    .get(b"seabreeze_get_formatted_spectrum_length\0")?,
                get_formatted_spectrum: *lib.get(b"seabreeze_get_formatted_spectrum\0")?,
                get_wavelengths: *lib.get(b"seabreeze_get_wavelengths\0")?,
                lib,
            })
        }
    }
    /// The library is loaded once per process; later calls ignore `path`.
    fn instance(path: Option<&Path>) -> Result<&'static SeaBreezeApi> {
        static API: OnceCell<SeaBreezeApi> = OnceCell::new();
        API.get_or_try_init(|| {
            let path = path.map(Path::to_path_buf).unwrap_or_else(default_library_path);
            Self::load(&path)
        })
    }
    fn check(&self, code: c_int, ctx: &str) -> Result<(), SpectroError> {
        if code == 0 {
            return Ok(());
        }
        let mut buf = [0 as c_char; ERROR_STRING_LEN];
        let message = unsafe {
            (self.get_error_string)(code, buf.as_mut_ptr(), ERROR_STRING_LEN as c_int);
            buf[ERROR_STRING_LEN - 1] = 0;
            CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
        };
        Err(SpectroError::Device(format!(
            "{ctx} failed (SeaBreeze code {code}: {message})"
        )))
    }
    fn read_string(
        &self,
        index: c_int,
        f: unsafe extern "C" fn(c_int, *mut c_int, *mut c_char, c_int) -> c_int,
        ctx: &str,
    ) -> Result<String, SpectroError> {
        let mut err: c_int = 0;
        let mut buf = [0 as c_char; 64];
        unsafe { f(index, &mut err as *mut c_int, buf.as_mut_ptr(), buf.len() as c_int) };
        self.check(err, ctx)?;
        buf[buf.len() - 1] = 0;
        Ok(unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned())
    }
}
pub fn default_library_path() -> PathBuf {
    PathBuf::from(libloading::library_filename("seabreeze"))
}
/// Ocean Optics USB spectrometer driven through the SeaBreeze C wrapper.
pub struct SeaBreezeSpectrometer {
    api: &'static SeaBreezeApi,
    index: c_int,
    pixels: usize,
    model: String,
    serial_number: String,
    min_integration_us: f64,
    closed: bool,
}
impl SeaBreezeSpectrometer {
    /// Opens the first spectrometer SeaBreeze can see.
    pub fn from_first_available(library: Option<&Path>) -> Result<Self, SpectroError> {
        let api = SeaBreezeApi::instance(library)
            .map_err(|e| SpectroError::Device(format!("{e:#}")))?;
        let mut err: c_int = 0;
        unsafe { (api.open_spectrometer)(FIRST_DEVICE, &mut err as *mut c_int) };
        if err != 0 {
            return Err(SpectroError::Device(
                "no spectrometer found; check power and USB cable".into(),
            ));
        }
        // From here on `Drop` closes the device if a query fails.
        let mut dev = Self {
            api,
            index: FIRST_DEVICE,
            pixels: 0,
            model: String::new(),
            serial_number: String::new(),
            min_integration_us: 0.0,
            closed: false,
        };
        let pixels =
            unsafe { (api.get_formatted_spectrum_length)(dev.index, &mut err as *mut c_int) };
        api.check(err, "get_formatted_spectrum_length")?;
        dev.pixels = pixels.max(0) as usize;
        let min_integration =
            unsafe { (api.get_min_integration_time_microsec)(dev.index, &mut err as *mut c_int) };
        api.check(err, "get_min_integration_time_microsec")?;
        dev.min_integration_us = min_integration.max(0) as f64;
        dev.model = api.read_string(dev.index, api.get_model, "get_model")?;
        dev.serial_number = api.read_string(dev.index, api.get_serial_number, "get_serial_number")?;
        log::info!(
            "opened {} (serial {}), {} pixels",
            dev.model,
            dev.serial_number,
            dev.pixels
        );
        Ok(dev)
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }
    fn ensure_open(&self) -> Result<(), SpectroError> {
        if self.closed {
            Err(SpectroError::Device("spectrometer already closed".into()))
        } else {
            Ok(())
        }
    }
    fn read_doubles(
        &self,
        f: unsafe extern "C" fn(c_int, *mut c_int, *mut c_double, c_int) -> c_int,
        ctx: &str,
    ) -> Result<Vec<f64>, SpectroError> {
        self.ensure_open()?;
        let mut err: c_int = 0;
        let mut buf = vec![0.0f64; self.pixels];
        let written = unsafe {
            f(
                self.index,
                &mut err as *mut c_int,
                buf.as_mut_ptr(),
                self.pixels as c_int,
            )
        };
        self.api.check(err, ctx)?;
        buf.truncate(written.max(0) as usize);
        Ok(buf)
    }
}
impl Spectrometer for SeaBreezeSpectrometer {
    fn wavelengths(&mut self) -> Result<Vec<f64>, SpectroError> {
        self.read_doubles(self.api.get_wavelengths, "get_wavelengths")
    }
    fn read_intensities(&mut self) -> Result<Vec<f64>, SpectroError> {
        self.read_doubles(self.api.get_formatted_spectrum, "get_formatted_spectrum")
    }
    fn set_integration_time_micros(&mut self, micros: f64) -> Result<(), SpectroError> {
        self.ensure_open()?;
        if micros < self.min_integration_us {
            return Err(SpectroError::InvalidArgument(format!(
                "{} supports integration times down to {:.0} us, got {micros:.0}",
                self.model, self.min_integration_us
            )));
        }
        let mut err: c_int = 0;
        unsafe {
            (self.api.set_integration_time_microsec)(
                self.index,
                &mut err as *mut c_int,
                micros.round() as c_ulong,
            )
        };
        self.api.check(err, "set_integration_time_microsec")
    }
    fn close(&mut self) -> Result<(), SpectroError> {
        if self.closed {
            return Ok(());
        }
        let mut err: c_int = 0;
        unsafe { (self.api.close_spectrometer)(self.index, &mut err as *mut c_int) };
        self.closed = true;
        self.api.check(err, "close_spectrometer")
    }
}
impl Drop for SeaBreezeSpectrometer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
