use std::f64::consts::PI;

use super::{freq_to_wavelength_m, InstrumentConfig};

/// Boltzmann's constant \[J/K\].
const K_B: f64 = 1.380649e-23;

/// \[W m^-2 Hz^-1\]
const JANSKY: f64 = 1e-26;

/// System equivalent flux density \[Jy\].
///
/// This ignores the dependence of the SEFD on direction and polarisation.
pub fn sefd_jy(config: &InstrumentConfig, freq_hz: f64) -> f64 {
    let lambda = freq_to_wavelength_m(freq_hz);
    let t_sky = config.sky_temp_k_per_m * lambda.powf(config.sky_temp_index);
    let t_sys = t_sky + config.receiver_temp_k;
    2.0 * K_B * t_sys / config.effective_area_m2 / JANSKY
}

/// The image noise \[Jy\] for an integration of `int_time_s` over
/// `bandwidth_hz`.
pub fn sensitivity_jy(
    config: &InstrumentConfig,
    freq_hz: f64,
    int_time_s: f64,
    n_antennas: u32,
    bandwidth_hz: f64,
) -> f64 {
    let n = f64::from(n_antennas);
    let n_baselines = (n / 2.0) * (n - 1.0);
    sefd_jy(config, freq_hz) / (bandwidth_hz * n_baselines * int_time_s).sqrt()
}

/// The smallest fluence \[Jy ms\] detectable at `snr`.
pub fn frb_min_fluence_jyms(
    config: &InstrumentConfig,
    snr: f64,
    freq_hz: f64,
    int_time_s: f64,
    n_antennas: u32,
    bandwidth_hz: f64,
) -> f64 {
    snr * sensitivity_jy(config, freq_hz, int_time_s, n_antennas, bandwidth_hz) * int_time_s * 1000.0
}

/// The angular size of an image pixel \[deg\], sampling the synthesised beam
/// twice.
pub fn pixsize_deg(longest_baseline_m: f64, freq_hz: f64) -> f64 {
    let u_max = longest_baseline_m / freq_to_wavelength_m(freq_hz);
    let pixsize_rad = 1.0 / (2.0 * u_max);
    pixsize_rad.to_degrees()
}

/// The number of pixels needed to cover `fov_deg2`.
pub fn npixels(fov_deg2: f64, longest_baseline_m: f64, freq_hz: f64) -> f64 {
    fov_deg2 / pixsize_deg(longest_baseline_m, freq_hz).powi(2)
}

/// The number of pixels in an image of the instrument's field of view at
/// `freq_hz`, using the `1.9 lambda / B` resolution of the synthesised beam.
pub fn npixels_beam(config: &InstrumentConfig, freq_hz: f64) -> f64 {
    let lambda = freq_to_wavelength_m(freq_hz);
    let res_deg = 1.9 * lambda / config.longest_baseline_m * 180.0 / PI;
    config.fov_deg2 / res_deg.powi(2)
}

/// A published FRB rate to scale from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrbSurvey {
    pub name: &'static str,

    /// \[sky^-1 day^-1\]
    pub rate: f64,

    pub freq_hz: f64,

    /// The fluence completeness limit of the rate \[Jy ms\].
    pub fluence_jyms: f64,
}

pub const CHIME: FrbSurvey = FrbSurvey {
    name: "CHIME",
    rate: 820.0,
    freq_hz: 600e6,
    fluence_jyms: 5.0,
};
pub const ASKAP: FrbSurvey = FrbSurvey {
    name: "ASKAP",
    rate: 37.0,
    freq_hz: 1400e6,
    fluence_jyms: 26.0,
};
pub const UTMOST: FrbSurvey = FrbSurvey {
    name: "UTMOST",
    rate: 98.0,
    freq_hz: 843e6,
    fluence_jyms: 8.0,
};

/// Scale a survey's rate to another frequency and fluence limit, assuming a
/// Euclidean fluence distribution and a spectral index `alpha`.
pub fn expected_frb_rate(reference: &FrbSurvey, freq_hz: f64, fluence_jyms: f64, alpha: f64) -> f64 {
    reference.rate
        * (freq_hz / reference.freq_hz).powf(alpha)
        * (fluence_jyms / reference.fluence_jyms).powf(-1.5)
}
