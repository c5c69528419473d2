//! Cold-plasma dispersion: delays between frequencies and per-channel delay
//! tables.

mod error;

pub use error::DispersionError;

use log::debug;
use ndarray::prelude::*;
use vec1::Vec1;

/// The dispersion constant \[ms GHz^2 cm^3 pc^-1\].
pub const K_DM: f64 = 4.15;

/// A more precise dispersion constant \[s MHz^2 cm^3 pc^-1\]. Note the
/// different units to [`K_DM`]; mixing the two is a classic way to be off by
/// a factor of 1000.
pub const K_DM_PRECISE: f64 = 4.148808e3;

/// The width of the MWA band \[MHz\].
pub const MWA_BANDWIDTH_MHZ: f64 = 30.72;

/// Step used when searching for the channel width matching a time resolution
/// \[GHz\] (1 kHz).
const BANDWIDTH_SEARCH_STEP_GHZ: f64 = 1e-6;

/// How far the rounded closed-form width may be nudged, in search steps.
const MAX_BANDWIDTH_CORRECTIONS: usize = 64;

fn check_freq(freq_ghz: f64) -> Result<(), DispersionError> {
    if freq_ghz.is_finite() && freq_ghz > 0.0 {
        Ok(())
    } else {
        Err(DispersionError::BadFrequency(freq_ghz))
    }
}

/// The dispersive delay \[ms\] of a signal at `f_low_ghz` relative to
/// `f_high_ghz` for a dispersion measure `dm` \[pc cm^-3\].
///
/// The delay is positive when `f_low_ghz < f_high_ghz` and `dm > 0`.
pub fn dispersive_delay_ms(dm: f64, f_low_ghz: f64, f_high_ghz: f64) -> Result<f64, DispersionError> {
    check_freq(f_low_ghz)?;
    check_freq(f_high_ghz)?;
    Ok(K_DM * dm * (f_low_ghz.powi(-2) - f_high_ghz.powi(-2)))
}

/// The same as [`dispersive_delay_ms`], but in seconds.
pub fn dispersive_delay_s(dm: f64, f_low_ghz: f64, f_high_ghz: f64) -> Result<f64, DispersionError> {
    dispersive_delay_ms(dm, f_low_ghz, f_high_ghz).map(|d| d / 1000.0)
}

/// The dispersive delay \[s\] across a band of `bandwidth_mhz` centred on
/// `centre_mhz`.
pub fn band_delay_s(dm: f64, centre_mhz: f64, bandwidth_mhz: f64) -> Result<f64, DispersionError> {
    let low_ghz = (centre_mhz - bandwidth_mhz / 2.0) / 1e3;
    let high_ghz = (centre_mhz + bandwidth_mhz / 2.0) / 1e3;
    dispersive_delay_s(dm, low_ghz, high_ghz)
}

/// Get the `n_channels + 1` ascending channel-edge frequencies \[GHz\] of a
/// band centred on `central_freq_mhz`.
pub fn compute_frequency_list_ghz(
    central_freq_mhz: f64,
    n_channels: usize,
    channel_width_mhz: f64,
) -> Vec1<f64> {
    let bottom_freq_mhz = central_freq_mhz - (n_channels as f64 * channel_width_mhz) / 2.0;
    let mut freqs = Vec1::new(bottom_freq_mhz / 1e3);
    for i in 1..=n_channels {
        freqs.push((bottom_freq_mhz + i as f64 * channel_width_mhz) / 1e3);
    }
    freqs
}

/// Find the channel width \[kHz\] above `centre_freq_mhz` whose dispersive
/// delay first reaches `time_res_s`, in whole 1 kHz steps. Resolutions at or
/// beyond the delay of an infinitely wide channel are an error.
pub fn required_bandwidth_khz(
    centre_freq_mhz: f64,
    dm: f64,
    time_res_s: f64,
) -> Result<f64, DispersionError> {
    if !(dm > 0.0) {
        return Err(DispersionError::NonPositive { what: "DM", value: dm });
    }
    if !(time_res_s > 0.0) {
        return Err(DispersionError::NonPositive {
            what: "time resolution",
            value: time_res_s,
        });
    }
    let start_ghz = centre_freq_mhz / 1e3;
    check_freq(start_ghz)?;

    // Even an infinitely wide channel can't delay by more than this.
    let max_delay_s = K_DM * dm * start_ghz.powi(-2) / 1000.0;
    if time_res_s >= max_delay_s {
        return Err(DispersionError::UnreachableResolution {
            time_res_s,
            max_delay_s,
        });
    }

    // Solve the delay equation for the upper frequency, round up to a whole
    // step, then nudge until this is the first step reaching the resolution.
    let f_exact_ghz = (start_ghz.powi(-2) - time_res_s * 1000.0 / (K_DM * dm)).powf(-0.5);
    let delay_after = |steps: f64| {
        dispersive_delay_s(dm, start_ghz, start_ghz + steps * BANDWIDTH_SEARCH_STEP_GHZ)
    };
    let mut steps = ((f_exact_ghz - start_ghz) / BANDWIDTH_SEARCH_STEP_GHZ)
        .ceil()
        .max(1.0);
    for _ in 0..MAX_BANDWIDTH_CORRECTIONS {
        if delay_after(steps)? < time_res_s {
            steps += 1.0;
        } else if steps > 1.0 && delay_after(steps - 1.0)? >= time_res_s {
            steps -= 1.0;
        } else {
            break;
        }
    }
    Ok(steps * BANDWIDTH_SEARCH_STEP_GHZ * 1e6)
}

/// Per-DM, per-channel delays in whole time samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayTable {
    /// The DM trials \[pc cm^-3\], one per row.
    pub dms: Vec1<f64>,

    /// The delays \[samples\]. Shape (number of DM trials, number of
    /// channels).
    pub delays: Array2<usize>,
}

impl DelayTable {
    /// Build a delay table from `n + 1` channel-edge frequencies \[GHz\].
    ///
    /// Channel `i` is represented by edge `i + 1`, and the last edge is the
    /// reference, so the last column is always 0. The reference is whatever
    /// comes last, not necessarily the highest frequency. Every delay is
    /// measured directly against the reference (never chained between
    /// neighbouring channels) and rounded to the nearest sample.
    ///
    /// The sign of each delay is discarded. With descending edges, channels
    /// above the reference get the same positive delays that channels below
    /// it would, so supply ascending frequencies (e.g. from
    /// [`compute_frequency_list_ghz`]) for physically meaningful
    /// dedispersion.
    pub fn new(frequencies_ghz: &[f64], dms: &[f64], int_time_s: f64) -> Result<DelayTable, DispersionError> {
        if frequencies_ghz.len() < 2 {
            return Err(DispersionError::TooFewFrequencies(frequencies_ghz.len()));
        }
        let dms = Vec1::try_from_vec(dms.to_vec()).map_err(|_| DispersionError::NoDms)?;
        if !(int_time_s > 0.0) {
            return Err(DispersionError::NonPositive {
                what: "integration time",
                value: int_time_s,
            });
        }
        for &f in frequencies_ghz {
            check_freq(f)?;
        }

        let n_channels = frequencies_ghz.len() - 1;
        let ref_freq = frequencies_ghz[n_channels];
        let mut delays = Array2::zeros((dms.len(), n_channels));
        for (mut row, &dm) in delays.outer_iter_mut().zip(dms.iter()) {
            // The reference channel (the last one) keeps its zero.
            for i_chan in (0..n_channels - 1).rev() {
                let chan_freq = frequencies_ghz[i_chan + 1];
                let (f_low, f_high) = if chan_freq <= ref_freq {
                    (chan_freq, ref_freq)
                } else {
                    (ref_freq, chan_freq)
                };
                let delay_s = dispersive_delay_s(dm, f_low, f_high)?;
                row[i_chan] = (delay_s.abs() / int_time_s).round() as usize;
            }
        }
        debug!(
            "Made a delay table with {} DM trials and {n_channels} channels; max delay {} samples",
            dms.len(),
            delays.iter().max().copied().unwrap_or(0)
        );

        Ok(DelayTable { dms, delays })
    }

    pub fn num_channels(&self) -> usize {
        self.delays.len_of(Axis(1))
    }

    /// The delays for a single DM trial.
    pub fn row(&self, i_dm: usize) -> Option<ArrayView1<usize>> {
        (i_dm < self.dms.len()).then(|| self.delays.row(i_dm))
    }
}
