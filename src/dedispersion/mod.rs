//! Incoherent dedispersion of dynamic spectra.
//!
//! Each channel is shifted *circularly* by its delay, i.e. samples pushed off
//! the start of a row wrap around to its end. This smears the end of an
//! observation into its beginning for large delays; zero padding would be the
//! physical alternative, but dynamic spectra produced by this crate have
//! always used the wrap-around behaviour.


use log::debug;
use ndarray::prelude::*;
use thiserror::Error;

use crate::dispersion::DelayTable;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DedispersionError {
    #[error("The dynamic spectrum has {spectrum} channels, but {delays} delays were supplied")]
    ChannelMismatch { spectrum: usize, delays: usize },

    #[error("Pulse arrival sample {sample} is outside of the {num_samples} time samples")]
    PulseOutOfRange { sample: usize, num_samples: usize },
}

/// Circularly shift `row` to the left by `shift` samples, i.e. `out[i] =
/// row[(i + shift) % len]`.
pub fn roll_left<T: Copy>(row: ArrayView1<T>, shift: usize) -> Array1<T> {
    let len = row.len();
    if len == 0 {
        return row.to_owned();
    }
    let shift = shift % len;
    Array1::from_shape_fn(len, |i| row[(i + shift) % len])
}

/// Circularly shift `row` to the right by `shift` samples; the inverse of
/// [`roll_left`].
pub fn roll_right<T: Copy>(row: ArrayView1<T>, shift: usize) -> Array1<T> {
    let len = row.len();
    if len == 0 {
        return row.to_owned();
    }
    roll_left(row, len - shift % len)
}

/// Dedisperse a dynamic spectrum (channel, time) with one delay per channel
/// \[samples\]. The output has the same shape as the input.
pub fn dedisperse(
    spectrum: ArrayView2<f32>,
    delays: ArrayView1<usize>,
) -> Result<Array2<f32>, DedispersionError> {
    let mut out = spectrum.to_owned();
    dedisperse_inplace(out.view_mut(), delays)?;
    Ok(out)
}

/// The same as [`dedisperse`], but overwrites the input.
pub fn dedisperse_inplace(
    mut spectrum: ArrayViewMut2<f32>,
    delays: ArrayView1<usize>,
) -> Result<(), DedispersionError> {
    let num_chans = spectrum.len_of(Axis(0));
    if num_chans != delays.len() {
        return Err(DedispersionError::ChannelMismatch {
            spectrum: num_chans,
            delays: delays.len(),
        });
    }

    for (mut row, &delay) in spectrum.outer_iter_mut().zip(delays.iter()) {
        if delay == 0 {
            continue;
        }
        let shifted = roll_left(row.view(), delay);
        row.assign(&shifted);
    }
    Ok(())
}

/// Dedisperse the spectrum for every DM trial of `table` and sum over
/// channels. The result has shape (number of DM trials, number of time
/// samples).
pub fn dm_time_plane(
    spectrum: ArrayView2<f32>,
    table: &DelayTable,
) -> Result<Array2<f32>, DedispersionError> {
    let num_samples = spectrum.len_of(Axis(1));
    let mut plane = Array2::zeros((table.dms.len(), num_samples));
    for (mut plane_row, delays) in plane.outer_iter_mut().zip(table.delays.outer_iter()) {
        let dedispersed = dedisperse(spectrum, delays)?;
        plane_row.assign(&dedispersed.sum_axis(Axis(0)));
    }
    debug!(
        "Made a DM-time plane with {} trials over {num_samples} samples",
        table.dms.len()
    );
    Ok(plane)
}

/// Add a dispersed pulse of `amplitude` to the spectrum. The pulse arrives at
/// `arrival_sample` in the reference channel and `delays[i]` samples later in
/// channel `i`, wrapping around the end of the time axis.
pub fn inject_dispersed_pulse(
    mut spectrum: ArrayViewMut2<f32>,
    delays: ArrayView1<usize>,
    arrival_sample: usize,
    amplitude: f32,
) -> Result<(), DedispersionError> {
    let (num_chans, num_samples) = spectrum.dim();
    if num_chans != delays.len() {
        return Err(DedispersionError::ChannelMismatch {
            spectrum: num_chans,
            delays: delays.len(),
        });
    }
    if arrival_sample >= num_samples {
        return Err(DedispersionError::PulseOutOfRange {
            sample: arrival_sample,
            num_samples,
        });
    }

    for (mut row, &delay) in spectrum.outer_iter_mut().zip(delays.iter()) {
        row[(arrival_sample + delay) % num_samples] += amplitude;
    }
    Ok(())
}
