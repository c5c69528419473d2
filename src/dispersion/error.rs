use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DispersionError {
    #[error("Frequency {0} GHz is not a positive, finite number")]
    BadFrequency(f64),

    #[error("The {what} must be positive, but got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error("At least 2 channel-edge frequencies are needed for a delay table, but got {0}")]
    TooFewFrequencies(usize),

    #[error("No DM trials were supplied")]
    NoDms,

    #[error("A time resolution of {time_res_s} s can never be reached; the largest possible delay is {max_delay_s} s")]
    UnreachableResolution { time_res_s: f64, max_delay_s: f64 },
}
