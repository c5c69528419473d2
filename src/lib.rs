//! Tools for searching MWA SMART survey data for fast radio bursts.

pub mod averaging;
pub mod candidates;
pub mod dedispersion;
pub mod dispersion;
mod error;
pub mod filenames;
pub mod models;
pub mod obs;
pub mod parsing;
pub mod peaks;
pub mod read;
pub mod stats;
pub mod write;

pub use error::SmartFrbError;

use hifitime::Epoch;
use indexmap::IndexMap;
use ndarray::prelude::*;

use averaging::AverageFactorError;
use dedispersion::DedispersionError;

/// Flux density as a function of (channel, time sample), along with the scalar
/// metadata of the FITS header it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicSpectrum {
    /// Shape (channels, time samples).
    pub data: Array2<f32>,

    /// e.g. `TIME` \[unix seconds\] and `MILLITIM` \[ms\], in header order.
    pub header: IndexMap<String, String>,

    /// The time of the first sample, if the header has it.
    pub start: Option<Epoch>,
}

impl DynamicSpectrum {
    pub fn new(data: Array2<f32>) -> DynamicSpectrum {
        DynamicSpectrum {
            data,
            header: IndexMap::new(),
            start: None,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn num_samples(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn average_channels(&mut self, factor: usize) -> Result<(), AverageFactorError> {
        self.data = averaging::average_channels(self.data.view(), factor)?;
        Ok(())
    }

    pub fn average_time(&mut self, factor: usize) -> Result<(), AverageFactorError> {
        self.data = averaging::average_time(self.data.view(), factor)?;
        Ok(())
    }

    /// Dedisperse in place with one delay \[samples\] per channel.
    pub fn dedisperse(&mut self, delays: ArrayView1<usize>) -> Result<(), DedispersionError> {
        dedispersion::dedisperse_inplace(self.data.view_mut(), delays)
    }
}

/// Initialise `env_logger`. Each level of `verbosity` shows more: info, debug
/// then trace; above that, timestamps and source lines are added too.
pub fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}

/// A progress bar over `len` files, drawn unless `hidden`.
pub fn file_progress_bar(
    len: usize,
    message: &'static str,
    hidden: bool,
) -> Result<indicatif::ProgressBar, indicatif::style::TemplateError> {
    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

    let bar = ProgressBar::with_draw_target(
        Some(len as u64),
        if hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} files ({elapsed_precise}<{eta_precise})")?
            .progress_chars("=> "),
    )
    .with_message(message);
    bar.tick();
    Ok(bar)
}
