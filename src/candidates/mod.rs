//! FRB candidates and the time series that accompany them.

mod codec;
mod error;
#[cfg(test)]
mod tests;
mod time_series;

pub use codec::{CandidateFile, CandidateReader};
pub use error::CandidateReadError;
pub use time_series::{pixel_series, TimeSeriesReader, TimeSeriesTable};

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    str::FromStr,
};

use log::debug;
use ndarray::prelude::*;

/// Which flavour of candidate file is being read. The headers are not
/// self-identifying, so this must be chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateFormat {
    /// 24-byte headers, candidates followed by their time series.
    Series,

    /// 20-byte headers (no `n_series`), candidates only.
    Legacy,
}

impl CandidateFormat {
    pub(crate) fn header_bytes(self) -> usize {
        match self {
            CandidateFormat::Series => 24,
            CandidateFormat::Legacy => 20,
        }
    }
}

/// How a candidate's local time step is turned into a global one.
///
/// The upstream pipeline writes a `global_offset` into every batch header,
/// but older analysis instead summed the buffer sizes of the preceding
/// batches. The two agree only if the pipeline never skips or overlaps
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOffset {
    /// Add the batch header's `global_offset`.
    #[default]
    HeaderGlobalOffset,

    /// Add the sum of the buffer sizes of all previous batches.
    AccumulatedBufferSize,
}

impl FromStr for TimeOffset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "header" | "global" => Ok(TimeOffset::HeaderGlobalOffset),
            "accumulated" | "buffer" => Ok(TimeOffset::AccumulatedBufferSize),
            _ => Err(format!(
                "'{s}' is not a time offset convention; use 'header' or 'accumulated'"
            )),
        }
    }
}

/// A batch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHeader {
    /// The time step of the first sample of this batch, as written by the
    /// pipeline.
    pub global_offset: i32,

    /// The side length of the (square) images \[pixels\].
    pub side_size: usize,

    pub n_dms: usize,

    /// The number of time samples in each series of this batch.
    pub buffer_size: usize,

    pub n_candidates: usize,

    /// Always 0 for [`CandidateFormat::Legacy`].
    pub n_series: usize,
}

/// A detected event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Unique over the whole file, counting from 0.
    pub id: u64,

    pub batch_id: u32,

    /// Pixel coordinates.
    pub x: i32,
    pub y: i32,

    /// The DM trial. The pipeline stores this as a float.
    pub dm: f32,

    /// The time step within the batch.
    pub local_time_step: i32,

    /// The time step within the observation (see [`TimeOffset`]).
    pub time_step: i64,

    /// \[Jy\]
    pub peak_flux: f32,

    /// \[Jy\]
    pub mean_flux: f32,

    pub std_dev: f32,
}

impl Candidate {
    pub fn snr(&self) -> f32 {
        (self.peak_flux - self.mean_flux) / self.std_dev
    }

    pub fn coord(&self) -> SeriesCoord {
        SeriesCoord {
            x: self.x,
            y: self.y,
            dm: self.dm,
        }
    }
}

/// The coordinate of a time series within a batch. Equality and hashing use
/// the bit pattern of `dm`.
#[derive(Debug, Clone, Copy)]
pub struct SeriesCoord {
    pub x: i32,
    pub y: i32,
    pub dm: f32,
}

impl PartialEq for SeriesCoord {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.dm.to_bits() == other.dm.to_bits()
    }
}

impl Eq for SeriesCoord {}

impl Hash for SeriesCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
        self.dm.to_bits().hash(state);
    }
}

/// A decoded batch.
#[derive(Debug, Clone)]
pub struct SeriesBatch {
    pub batch_id: u32,
    pub header: BatchHeader,
    pub candidates: Vec<Candidate>,

    /// Maps a coordinate to its row in `series`.
    pub series_index: HashMap<SeriesCoord, usize>,

    /// Shape (n_series, buffer_size).
    pub series: Array2<f32>,
}

impl SeriesBatch {
    /// The time series recorded at a coordinate, if there is one.
    pub fn series_at(&self, coord: SeriesCoord) -> Option<ArrayView1<f32>> {
        self.series_index
            .get(&coord)
            .map(|&i| self.series.row(i))
    }

    /// The time \[s\] of each sample of this batch's series.
    pub fn time_axis(&self, time_res_s: f64) -> Vec<f64> {
        let start = i64::from(self.header.global_offset);
        (0..self.header.buffer_size as i64)
            .map(|i| (start + i) as f64 * time_res_s)
            .collect()
    }
}

/// Which candidates to keep, based on their SNR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnrFilter {
    All,

    /// Keep candidates with an SNR at least this big.
    AtLeast(f32),
}

impl SnrFilter {
    /// Command-line tools have always used an SNR threshold of -1 to mean
    /// "don't filter"; any threshold at or below it keeps everything.
    pub const NO_FILTER: f32 = -1.0;

    pub fn from_threshold(threshold: f32) -> SnrFilter {
        if threshold > Self::NO_FILTER {
            SnrFilter::AtLeast(threshold)
        } else {
            SnrFilter::All
        }
    }

    pub fn keeps(&self, candidate: &Candidate) -> bool {
        match self {
            SnrFilter::All => true,
            SnrFilter::AtLeast(t) => candidate.snr() >= *t,
        }
    }
}

/// Keep the candidates passing `filter`, preserving their order.
pub fn filter_candidates(candidates: &[Candidate], filter: SnrFilter) -> Vec<Candidate> {
    candidates
        .iter()
        .filter(|c| filter.keeps(c))
        .copied()
        .collect()
}

/// All of the batches of a file, held in memory.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    /// Indexed by batch ID.
    pub batches: Vec<SeriesBatch>,
}

impl CandidateSet {
    pub fn read(file: &CandidateFile) -> Result<CandidateSet, CandidateReadError> {
        let batches = file.batches()?.collect::<Result<Vec<_>, _>>()?;
        let set = CandidateSet { batches };
        debug!(
            "Read {} batches with {} candidates",
            set.batches.len(),
            set.num_candidates()
        );
        Ok(set)
    }

    pub fn num_candidates(&self) -> usize {
        self.batches.iter().map(|b| b.candidates.len()).sum()
    }

    /// All candidates in file order.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.batches.iter().flat_map(|b| b.candidates.iter())
    }

    pub fn filtered(&self, filter: SnrFilter) -> Vec<Candidate> {
        self.candidates()
            .filter(|c| filter.keeps(c))
            .copied()
            .collect()
    }

    pub fn find(&self, id: u64) -> Option<&Candidate> {
        self.candidates().find(|c| c.id == id)
    }

    /// The side length of the images, taken from the first batch.
    pub fn side_size(&self) -> Option<usize> {
        self.batches.first().map(|b| b.header.side_size)
    }

    pub fn batch_of(&self, candidate: &Candidate) -> Option<&SeriesBatch> {
        self.batches
            .get(candidate.batch_id as usize)
            .filter(|b| b.batch_id == candidate.batch_id)
    }

    /// The time series recorded for a candidate, if the pipeline saved one.
    pub fn series_of(&self, candidate: &Candidate) -> Option<ArrayView1<f32>> {
        self.batch_of(candidate)
            .and_then(|b| b.series_at(candidate.coord()))
    }
}
