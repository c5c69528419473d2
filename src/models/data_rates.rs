use log::debug;

use super::{positive, ConfigError, InstrumentConfig};
use crate::dispersion::{band_delay_s, MWA_BANDWIDTH_MHZ};

const BITS_PER_GIB: f64 = 8.0 * 1024.0 * 1024.0 * 1024.0;

pub fn bits_to_gib(bits: f64) -> f64 {
    bits / BITS_PER_GIB
}

/// The correlator's output: complex float32 visibilities for every baseline
/// and polarisation product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlator {
    pub n_channels: f64,

    /// Includes autocorrelations.
    pub n_baselines: f64,

    /// Integrations per second.
    pub n_intervals: f64,

    pub n_pols: u32,
}

impl Correlator {
    const BITS_PER_VISIBILITY: f64 = 2.0 * 32.0;

    pub fn new(
        config: &InstrumentConfig,
        int_time_s: f64,
        channels_to_avg: u32,
    ) -> Result<Correlator, ConfigError> {
        let int_time_s = positive("integration time", int_time_s)?;
        let channels_to_avg = positive("channel averaging factor", f64::from(channels_to_avg))?;
        let n = f64::from(config.n_antennas);
        Ok(Correlator {
            n_channels: f64::from(config.n_channels) / channels_to_avg,
            n_baselines: (n / 2.0) * (n + 1.0),
            n_intervals: 1.0 / int_time_s,
            n_pols: config.n_pols,
        })
    }

    pub fn data_rate_bits(&self) -> f64 {
        self.n_intervals
            * self.n_channels
            * self.n_baselines
            * f64::from(self.n_pols).powi(2)
            * Self::BITS_PER_VISIBILITY
    }
}

/// One image per fine channel per integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Imager {
    pub image_side: u32,
    pub bits_per_pixel: u32,
    pub correlator: Correlator,
}

impl Imager {
    pub const DEFAULT_IMAGE_SIDE: u32 = 1024;
    pub const DEFAULT_BITS_PER_PIXEL: u32 = 32;

    pub fn new(correlator: Correlator, image_side: u32, bits_per_pixel: u32) -> Imager {
        Imager {
            image_side,
            bits_per_pixel,
            correlator,
        }
    }

    fn bits_per_image(&self) -> f64 {
        f64::from(self.image_side).powi(2) * f64::from(self.bits_per_pixel)
    }

    pub fn data_rate_bits(&self) -> f64 {
        self.bits_per_image() * self.correlator.n_channels * self.correlator.n_intervals
    }
}

/// Dedispersion collapses the channels of every pixel into one time series per
/// DM trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedispersionStage {
    pub n_dm_trials: u32,
    pub imager: Imager,
}

impl DedispersionStage {
    pub fn new(imager: Imager, n_dm_trials: u32) -> DedispersionStage {
        DedispersionStage {
            n_dm_trials,
            imager,
        }
    }

    pub fn data_rate_bits(&self) -> f64 {
        self.imager.bits_per_image()
            * f64::from(self.n_dm_trials)
            * self.imager.correlator.n_intervals
    }
}

/// The inputs of a data-rate study.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRateParams {
    pub int_time_s: f64,
    pub channel_avg_factor: u32,
    pub image_side: u32,
    pub bits_per_pixel: u32,
    pub n_dm_trials: u32,

    /// The DM used to size the dedispersion buffers \[pc cm^-3\].
    pub representative_dm: f64,

    /// The centre of the observing band \[MHz\].
    pub band_centre_mhz: f64,
}

impl Default for DataRateParams {
    fn default() -> Self {
        DataRateParams {
            int_time_s: 0.02,
            channel_avg_factor: 4,
            image_side: Imager::DEFAULT_IMAGE_SIDE,
            bits_per_pixel: Imager::DEFAULT_BITS_PER_PIXEL,
            n_dm_trials: 1000,
            representative_dm: 600.0,
            band_centre_mhz: 150.0,
        }
    }
}

/// The data produced by each stage of the pipeline \[GiB per second of
/// observation\], and the volumes needed to buffer one dispersive sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRequirements {
    pub voltages_gibps: f64,
    pub visibilities_gibps: f64,
    pub images_gibps: f64,
    pub dedispersed_gibps: f64,

    /// The dispersive delay across the band at the representative DM \[s\].
    pub sweep_s: f64,

    /// \[GiB\]
    pub images_volume_gib: f64,

    /// \[GiB\]
    pub dedispersed_volume_gib: f64,

    pub n_fine_channels: f64,

    /// \[kHz\]
    pub fine_channel_width_khz: f64,
}

impl DataRequirements {
    pub fn compute(
        config: &InstrumentConfig,
        params: &DataRateParams,
    ) -> Result<DataRequirements, ConfigError> {
        let correlator = Correlator::new(config, params.int_time_s, params.channel_avg_factor)?;
        let imager = Imager::new(correlator, params.image_side, params.bits_per_pixel);
        let dedisp = DedispersionStage::new(imager, params.n_dm_trials);
        let sweep_s = band_delay_s(
            params.representative_dm,
            params.band_centre_mhz,
            MWA_BANDWIDTH_MHZ,
        )?;
        debug!("Dispersive sweep at DM {}: {sweep_s} s", params.representative_dm);

        let images_gibps = bits_to_gib(imager.data_rate_bits());
        let dedispersed_gibps = bits_to_gib(dedisp.data_rate_bits());
        Ok(DataRequirements {
            voltages_gibps: bits_to_gib(config.voltage_data_rate_bits()),
            visibilities_gibps: bits_to_gib(correlator.data_rate_bits()),
            images_gibps,
            dedispersed_gibps,
            sweep_s,
            images_volume_gib: images_gibps * sweep_s,
            dedispersed_volume_gib: dedispersed_gibps * sweep_s,
            n_fine_channels: correlator.n_channels,
            fine_channel_width_khz: MWA_BANDWIDTH_MHZ * 1000.0 / correlator.n_channels,
        })
    }
}
