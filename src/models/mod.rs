//! Theoretical models of the instrument: sensitivity, data rates and
//! computational costs.

mod costs;
mod data_rates;
mod error;
mod sensitivity;

pub use costs::*;
pub use data_rates::*;
pub use error::ConfigError;
pub use sensitivity::*;

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

/// \[m/s\]
pub const SPEED_OF_LIGHT: f64 = 299792458.0;

pub fn freq_to_wavelength_m(freq_hz: f64) -> f64 {
    SPEED_OF_LIGHT / freq_hz
}

/// The hardware parameters the models are evaluated for. Any field missing
/// from an instrument file takes its [`InstrumentConfig::MWA_PHASE_1`] value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
    pub n_antennas: u32,
    pub n_pols: u32,

    /// The number of fine channels across the band.
    pub n_channels: u32,

    /// \[Hz\]
    pub sampling_freq_hz: f64,

    pub bits_per_sample: u32,

    /// \[deg^2\]
    pub fov_deg2: f64,

    /// \[m\]
    pub longest_baseline_m: f64,

    /// The time resolution of the voltages \[s\].
    pub time_res_s: f64,

    /// \[m^2\]
    pub effective_area_m2: f64,

    /// \[K\]
    pub receiver_temp_k: f64,

    /// The sky temperature is modelled as `sky_temp_k_per_m * lambda ^
    /// sky_temp_index` with lambda in metres.
    pub sky_temp_k_per_m: f64,
    pub sky_temp_index: f64,
}

impl InstrumentConfig {
    pub const MWA_PHASE_1: InstrumentConfig = InstrumentConfig {
        n_antennas: 128,
        n_pols: 2,
        n_channels: 3072,
        sampling_freq_hz: 1e4,
        bits_per_sample: 8,
        fov_deg2: 610.0,
        longest_baseline_m: 2864.0,
        time_res_s: 1e-4,
        effective_area_m2: 4.75,
        receiver_temp_k: 180.0,
        sky_temp_k_per_m: 60.0,
        sky_temp_index: 2.25,
    };

    pub fn from_toml_str(s: &str, file: &Path) -> Result<InstrumentConfig, ConfigError> {
        let config: InstrumentConfig = toml::from_str(s).map_err(|err| ConfigError::Toml {
            file: file.to_path_buf(),
            err,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(file: P) -> Result<InstrumentConfig, ConfigError> {
        let file = file.as_ref();
        debug!("Reading instrument configuration from {}", file.display());
        let contents = std::fs::read_to_string(file).map_err(|err| ConfigError::Read {
            file: file.to_path_buf(),
            err,
        })?;
        Self::from_toml_str(&contents, file)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("number of antennas", f64::from(self.n_antennas)),
            ("number of polarisations", f64::from(self.n_pols)),
            ("number of channels", f64::from(self.n_channels)),
            ("sampling frequency", self.sampling_freq_hz),
            ("bits per sample", f64::from(self.bits_per_sample)),
            ("field of view", self.fov_deg2),
            ("longest baseline", self.longest_baseline_m),
            ("time resolution", self.time_res_s),
            ("effective area", self.effective_area_m2),
        ];
        for (what, value) in checks {
            positive(what, value)?;
        }
        Ok(())
    }

    /// The number of cross-correlation baselines.
    pub fn num_baselines(&self) -> f64 {
        let n = f64::from(self.n_antennas);
        (n / 2.0) * (n - 1.0)
    }

    /// The rate at which raw voltages are produced \[bits/s\].
    pub fn voltage_data_rate_bits(&self) -> f64 {
        f64::from(self.n_antennas)
            * f64::from(self.n_pols)
            * f64::from(self.n_channels)
            * self.sampling_freq_hz
            * f64::from(self.bits_per_sample)
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self::MWA_PHASE_1
    }
}

pub(crate) fn positive(what: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { what, value })
    }
}
