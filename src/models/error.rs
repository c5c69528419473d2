use std::path::PathBuf;

use thiserror::Error;

use crate::dispersion::DispersionError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Couldn't read instrument file {file}: {err}")]
    Read { file: PathBuf, err: std::io::Error },

    #[error("Couldn't decode toml structure from {file}:\n{err}")]
    Toml { file: PathBuf, err: toml::de::Error },

    #[error("The {what} must be positive, but got {value}")]
    NonPositive { what: &'static str, value: f64 },

    #[error(transparent)]
    Dispersion(#[from] DispersionError),
}
