//! Averaging dynamic spectra in frequency and time.

use log::debug;
use ndarray::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AverageFactorError {
    #[error("The averaging factor was 0; this is not permitted")]
    Zero,

    #[error("Averaging factor {factor} is not a divisor of the number of {axis} ({len})")]
    NotDivisor {
        factor: usize,
        axis: &'static str,
        len: usize,
    },
}

/// Average every `factor` consecutive channels (rows) of a dynamic spectrum.
pub fn average_channels(
    spectrum: ArrayView2<f32>,
    factor: usize,
) -> Result<Array2<f32>, AverageFactorError> {
    average_axis(spectrum, Axis(0), factor, "channels")
}

/// Average every `factor` consecutive time samples (columns) of a dynamic
/// spectrum.
pub fn average_time(
    spectrum: ArrayView2<f32>,
    factor: usize,
) -> Result<Array2<f32>, AverageFactorError> {
    average_axis(spectrum, Axis(1), factor, "time samples")
}

fn average_axis(
    spectrum: ArrayView2<f32>,
    axis: Axis,
    factor: usize,
    axis_name: &'static str,
) -> Result<Array2<f32>, AverageFactorError> {
    if factor == 0 {
        return Err(AverageFactorError::Zero);
    }
    let len = spectrum.len_of(axis);
    if len % factor != 0 {
        return Err(AverageFactorError::NotDivisor {
            factor,
            axis: axis_name,
            len,
        });
    }
    if factor == 1 {
        return Ok(spectrum.to_owned());
    }

    let mut out_dim = spectrum.raw_dim();
    out_dim[axis.index()] = len / factor;
    debug!(
        "Averaging {axis_name} by {factor}: {:?} -> {:?}",
        spectrum.dim(),
        (out_dim[0], out_dim[1])
    );

    let mut averaged = Array2::zeros(out_dim);
    for (mut out_lane, chunk) in averaged
        .axis_iter_mut(axis)
        .zip(spectrum.axis_chunks_iter(axis, factor))
    {
        // Accumulate in f64; dynamic spectra can be long.
        let sum = chunk.mapv(f64::from).sum_axis(axis);
        out_lane.assign(&sum.mapv(|s| (s / factor as f64) as f32));
    }

    Ok(averaged)
}
