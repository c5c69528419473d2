//! Computational cost, in "steps" per voltage time sample, of forming beams
//! versus making images.

use super::{positive, ConfigError, InstrumentConfig};

/// Forming `n_pixels` beams costs one step per pixel per antenna.
pub fn beamforming_cost_per_time_sample(config: &InstrumentConfig, n_pixels: f64) -> f64 {
    n_pixels * f64::from(config.n_antennas)
}

pub fn correlation_cost_per_time_sample(config: &InstrumentConfig) -> f64 {
    config.num_baselines()
}

/// Gridding and FFTs happen once per integration, so their cost is spread over
/// the voltage samples in it.
fn samples_per_integration(config: &InstrumentConfig, int_time_s: f64) -> Result<f64, ConfigError> {
    positive("integration time", int_time_s).map(|t| t / config.time_res_s)
}

pub fn gridding_cost_per_time_sample(
    config: &InstrumentConfig,
    int_time_s: f64,
) -> Result<f64, ConfigError> {
    Ok(config.num_baselines() / samples_per_integration(config, int_time_s)?)
}

pub fn fft_cost_per_time_sample(
    config: &InstrumentConfig,
    n_pixels: f64,
    int_time_s: f64,
) -> Result<f64, ConfigError> {
    Ok(n_pixels * n_pixels.log2() / samples_per_integration(config, int_time_s)?)
}

/// The imaging cost broken into its steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagingCost {
    pub correlation: f64,
    pub gridding: f64,
    pub fft: f64,
}

impl ImagingCost {
    pub fn per_time_sample(
        config: &InstrumentConfig,
        n_pixels: f64,
        int_time_s: f64,
    ) -> Result<ImagingCost, ConfigError> {
        Ok(ImagingCost {
            correlation: correlation_cost_per_time_sample(config),
            gridding: gridding_cost_per_time_sample(config, int_time_s)?,
            fft: fft_cost_per_time_sample(config, n_pixels, int_time_s)?,
        })
    }

    pub fn total(&self) -> f64 {
        self.correlation + self.gridding + self.fft
    }
}
