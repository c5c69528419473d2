//! Finding outliers in flux time series.

mod error;
#[cfg(test)]
mod tests;

pub use error::PeakError;

use std::str::FromStr;

use log::{debug, trace};

use crate::candidates::TimeSeriesTable;

pub const DEFAULT_SNR: f64 = 5.0;
pub const DEFAULT_ALPHA: f64 = 0.9;

/// The ratio of the interquartile range to the standard deviation of a normal
/// distribution.
const IQR_TO_SIGMA: f64 = 1.35;

/// How the baseline and noise of a time series are estimated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimator {
    /// Median baseline and an interquartile-range noise estimate. Quartiles are
    /// taken at truncated positions of the sorted samples, not interpolated.
    Robust,

    /// An exponentially-weighted running mean of the absolute values. `alpha`
    /// is the weight given to the history.
    RunningMean { alpha: f64 },

    /// The (absolute) mean and sample standard deviation of the whole series.
    MeanStd,
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Robust => "robust",
            Estimator::RunningMean { .. } => "running-mean",
            Estimator::MeanStd => "mean-std",
        }
    }
}

impl FromStr for Estimator {
    type Err = PeakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "robust" | "iqr" => Ok(Estimator::Robust),
            "running-mean" | "running" => Ok(Estimator::RunningMean {
                alpha: DEFAULT_ALPHA,
            }),
            "mean-std" | "simple" => Ok(Estimator::MeanStd),
            _ => Err(PeakError::UnknownEstimator(s.to_string())),
        }
    }
}

/// The outcome of searching a time series for peaks.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakResult {
    /// The samples the estimator looked at. The running mean works on
    /// absolute values, except for the first sample, which only seeds the
    /// mean.
    pub raw: Vec<f64>,

    /// The baseline each sample was compared against. For
    /// [`Estimator::RunningMean`] this is one shorter than the input: entry
    /// `t - 1` is the mean that sample `t` was tested against, and the first
    /// sample is never tested.
    pub baseline: Vec<f64>,

    /// (sample index, value) of every flagged sample, in order.
    pub candidates: Vec<(usize, f64)>,
}

/// Search `series` for samples at least `snr` "sigma" above the baseline.
pub fn find_peaks(
    series: &[f32],
    estimator: Estimator,
    snr: f64,
) -> Result<PeakResult, PeakError> {
    if series.is_empty() {
        return Err(PeakError::EmptyTimeSeries);
    }
    let values: Vec<f64> = series.iter().map(|&v| f64::from(v)).collect();
    let result = match estimator {
        Estimator::Robust => robust(values, snr),
        Estimator::RunningMean { alpha } => running_mean(values, alpha, snr),
        Estimator::MeanStd => mean_std(values, snr)?,
    };
    trace!(
        "{} estimator flagged {} of {} samples",
        estimator.name(),
        result.candidates.len(),
        series.len()
    );
    Ok(result)
}

/// Flag samples against a constant baseline and noise level. A zero scale
/// flags everything strictly above the baseline.
fn flag_against(values: &[f64], baseline: f64, scale: f64, snr: f64) -> Vec<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| {
            if scale == 0.0 {
                v > baseline
            } else {
                (v - baseline) / scale >= snr
            }
        })
        .collect()
}

fn robust(values: Vec<f64>, snr: f64) -> PeakResult {
    let mut sorted = values.clone();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let scale = (q3 - q1) / IQR_TO_SIGMA;
    let median = sorted[n / 2];

    PeakResult {
        candidates: flag_against(&values, median, scale, snr),
        baseline: vec![median; n],
        raw: values,
    }
}

fn running_mean(values: Vec<f64>, alpha: f64, snr: f64) -> PeakResult {
    let mut mean = values[0];
    let mut raw = Vec::with_capacity(values.len());
    let mut baseline = Vec::with_capacity(values.len() - 1);
    let mut candidates = vec![];
    raw.push(mean);
    for (t, v) in values.into_iter().enumerate().skip(1) {
        let v = v.abs();
        raw.push(v);
        baseline.push(mean);
        // A zero mean gives infinity for any non-zero sample, and NaN (never
        // flagged) for a zero sample.
        if v / mean >= snr {
            candidates.push((t, v));
        }
        mean = alpha * mean + (1.0 - alpha) * v;
    }

    PeakResult {
        raw,
        baseline,
        candidates,
    }
}

fn mean_std(values: Vec<f64>, snr: f64) -> Result<PeakResult, PeakError> {
    let n = values.len();
    if n < 2 {
        return Err(PeakError::TooShort {
            estimator: "mean-std",
            needed: 2,
            got: n,
        });
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let baseline = mean.abs();

    Ok(PeakResult {
        candidates: flag_against(&values, baseline, variance.sqrt(), snr),
        baseline: vec![baseline; n],
        raw: values,
    })
}

/// Search one pixel of a time-series dump for peaks, for every DM trial.
/// Returns the DM index alongside each result.
pub fn find_peaks_in_table(
    table: &TimeSeriesTable,
    x: usize,
    y: usize,
    estimator: Estimator,
    snr: f64,
) -> Result<Vec<(usize, PeakResult)>, PeakError> {
    let side = table.data.len_of(ndarray::Axis(0));
    if x >= side || y >= side {
        return Err(PeakError::PixelOutOfRange { x, y, side });
    }
    debug!(
        "Searching pixel ({x}, {y}) of time series block {} for peaks",
        table.index
    );
    (0..table.num_dms())
        .map(|dm| {
            let series = table
                .series(x, y, dm)
                .ok_or(PeakError::PixelOutOfRange { x, y, side })?;
            let series = series.to_vec();
            Ok((dm, find_peaks(&series, estimator, snr)?))
        })
        .collect()
}
