use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PeakError {
    #[error("Cannot search for peaks in an empty time series")]
    EmptyTimeSeries,

    #[error("The {estimator} estimator needs at least {needed} samples, but the time series has {got}")]
    TooShort {
        estimator: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Pixel ({x}, {y}) is outside of the {side}x{side} image")]
    PixelOutOfRange { x: usize, y: usize, side: usize },

    #[error("'{0}' is not a peak estimator; use 'robust', 'running-mean' or 'mean-std'")]
    UnknownEstimator(String),
}
