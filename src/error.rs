use thiserror::Error;

use crate::{
    averaging::AverageFactorError, candidates::CandidateReadError,
    dedispersion::DedispersionError, dispersion::DispersionError, filenames::FilenameError,
    models::ConfigError, obs::ObsMetadataError, parsing::ParseListError, peaks::PeakError,
    read::FitsError, stats::StatsError,
};

/// All of the errors the `smart_frb` binaries can report.
#[derive(Error, Debug)]
pub enum SmartFrbError {
    #[error(transparent)]
    Dispersion(#[from] DispersionError),

    #[error(transparent)]
    Averaging(#[from] AverageFactorError),

    #[error(transparent)]
    Dedispersion(#[from] DedispersionError),

    #[error(transparent)]
    Candidates(#[from] CandidateReadError),

    #[error(transparent)]
    Peaks(#[from] PeakError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ObsMetadata(#[from] ObsMetadataError),

    #[error(transparent)]
    Filename(#[from] FilenameError),

    #[error(transparent)]
    ParseList(#[from] ParseListError),

    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error(transparent)]
    Toml(#[from] toml::ser::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
