//! Summary statistics of images.

use ndarray::{ArrayView, Dimension};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StatsError {
    #[error("Cannot compute statistics of an empty array")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub mean: f64,

    /// Population standard deviation.
    pub std: f64,

    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl ImageStats {
    pub fn compute<D: Dimension>(values: ArrayView<f32, D>) -> Result<ImageStats, StatsError> {
        if values.is_empty() {
            return Err(StatsError::Empty);
        }
        let mut sorted: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Ok(ImageStats {
            mean,
            std: variance.sqrt(),
            median,
            min: sorted[0],
            max: sorted[n - 1],
        })
    }
}
