use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObsMetadataError {
    #[error("Couldn't read {file}: {err}")]
    Read { file: PathBuf, err: std::io::Error },

    #[error("Couldn't parse the observation XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("The observation XML has no TABLE element")]
    NoTable,

    #[error("Observation {obs} has no value for '{field}'")]
    MissingField { obs: String, field: &'static str },

    #[error("Observation {obs} has a non-{expected} value for '{field}'")]
    WrongType {
        obs: String,
        field: &'static str,
        expected: &'static str,
    },
}
