//! Decoding of the binary candidate-series files written by the imaging
//! pipeline.
//!
//! Each batch is laid out as (all little endian):
//!
//! 1. a header of six `i32`s: `global_offset, side_size, n_dms, buffer_size,
//!    n_candidates, n_series` (legacy files have only the first five);
//! 2. `n_candidates` 28-byte records: `x: i32, y: i32, dm: f32, time_step:
//!    i32, peak: f32, mean: f32, std: f32`;
//! 3. (not in legacy files) `n_series` entries of a 12-byte coordinate `x:
//!    i32, y: i32, dm: f32` followed by `buffer_size` `f32`s.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use log::{debug, trace, warn};
use ndarray::prelude::*;

use super::{
    BatchHeader, Candidate, CandidateFormat, CandidateReadError, SeriesBatch, SeriesCoord,
    TimeOffset,
};

const CANDIDATE_RECORD_BYTES: usize = 28;

/// Fill `buf` from `reader`. Returns the number of bytes read, which is only
/// less than `buf.len()` if the reader ran out of data.
pub(super) fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read `n` little-endian `f32`s. The buffer grows with the data actually
/// read, so a bogus `n` can't allocate more than the stream holds. A short
/// read is an `UnexpectedEof`.
pub(super) fn read_f32s<R: Read>(reader: &mut R, n: usize) -> std::io::Result<Vec<f32>> {
    let n_bytes = (n as u64).saturating_mul(4);
    let mut bytes = vec![];
    reader.by_ref().take(n_bytes).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < n_bytes {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    let mut values = vec![0.0; n];
    LittleEndian::read_f32_into(&bytes, &mut values);
    Ok(values)
}

/// A candidate-series file on disk. Every call to [`CandidateFile::batches`]
/// starts reading again from the beginning of the file.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub format: CandidateFormat,
    pub time_offset: TimeOffset,
}

impl CandidateFile {
    pub fn new<P: AsRef<Path>>(
        path: P,
        format: CandidateFormat,
        time_offset: TimeOffset,
    ) -> CandidateFile {
        CandidateFile {
            path: path.as_ref().to_path_buf(),
            format,
            time_offset,
        }
    }

    pub fn batches(&self) -> Result<CandidateReader<BufReader<File>>, CandidateReadError> {
        debug!("Reading candidates from {}", self.path.display());
        let file = BufReader::new(File::open(&self.path)?);
        Ok(CandidateReader::new(file, self.format, self.time_offset))
    }
}

/// A forward-only iterator over the batches of a candidate-series stream.
///
/// Iteration stops after the first error.
pub struct CandidateReader<R: Read> {
    reader: R,
    format: CandidateFormat,
    time_offset: TimeOffset,

    next_candidate_id: u64,
    next_batch_id: u32,

    /// The sum of the buffer sizes of all batches read so far.
    accumulated_samples: i64,

    finished: bool,
    warned_about_offsets: bool,
}

impl<R: Read> CandidateReader<R> {
    pub fn new(reader: R, format: CandidateFormat, time_offset: TimeOffset) -> CandidateReader<R> {
        CandidateReader {
            reader,
            format,
            time_offset,
            next_candidate_id: 0,
            next_batch_id: 0,
            accumulated_samples: 0,
            finished: false,
            warned_about_offsets: false,
        }
    }

    fn read_header(&mut self, block: usize) -> Result<Option<BatchHeader>, CandidateReadError> {
        let header_len = self.format.header_bytes();
        let mut buf = [0; 24];
        let buf = &mut buf[..header_len];
        match fill_or_eof(&mut self.reader, buf)? {
            0 => return Ok(None),
            n if n < header_len => {
                return Err(CandidateReadError::Truncated {
                    block,
                    section: "header",
                })
            }
            _ => (),
        }

        let mut fields = [0; 6];
        LittleEndian::read_i32_into(buf, &mut fields[..header_len / 4]);
        let [global_offset, side_size, n_dms, buffer_size, n_candidates, n_series] = fields;

        let check = |field: &'static str, value: i32| {
            if value < 0 {
                Err(CandidateReadError::BadHeader {
                    block,
                    field,
                    value,
                })
            } else {
                Ok(value as usize)
            }
        };
        Ok(Some(BatchHeader {
            global_offset,
            side_size: check("side_size", side_size)?,
            n_dms: check("n_dms", n_dms)?,
            buffer_size: check("buffer_size", buffer_size)?,
            n_candidates: check("n_candidates", n_candidates)?,
            n_series: check("n_series", n_series)?,
        }))
    }

    fn read_batch(&mut self) -> Result<Option<SeriesBatch>, CandidateReadError> {
        let batch_id = self.next_batch_id;
        let block = batch_id as usize;
        let header = match self.read_header(block)? {
            Some(h) => h,
            None => return Ok(None),
        };
        trace!("Batch {batch_id}: {header:?}");

        let header_offset = i64::from(header.global_offset);
        if header_offset != self.accumulated_samples && !self.warned_about_offsets {
            warn!(
                "Batch {batch_id} declares a global offset of {header_offset}, but previous batches add up to {} samples; using {:?}",
                self.accumulated_samples, self.time_offset
            );
            self.warned_about_offsets = true;
        }
        let base_time_step = match self.time_offset {
            TimeOffset::HeaderGlobalOffset => header_offset,
            TimeOffset::AccumulatedBufferSize => self.accumulated_samples,
        };

        let mut candidates = vec![];
        let mut record = [0; CANDIDATE_RECORD_BYTES];
        for _ in 0..header.n_candidates {
            self.reader
                .read_exact(&mut record)
                .map_err(|e| CandidateReadError::from_io(e, block, "candidates"))?;
            let local_time_step = LittleEndian::read_i32(&record[12..16]);
            candidates.push(Candidate {
                id: self.next_candidate_id,
                batch_id,
                x: LittleEndian::read_i32(&record[0..4]),
                y: LittleEndian::read_i32(&record[4..8]),
                dm: LittleEndian::read_f32(&record[8..12]),
                local_time_step,
                time_step: base_time_step + i64::from(local_time_step),
                peak_flux: LittleEndian::read_f32(&record[16..20]),
                mean_flux: LittleEndian::read_f32(&record[20..24]),
                std_dev: LittleEndian::read_f32(&record[24..28]),
            });
            self.next_candidate_id += 1;
        }

        let eof = |e| CandidateReadError::from_io(e, block, "series");
        let mut series_index = HashMap::new();
        let mut values = vec![];
        for i_series in 0..header.n_series {
            let coord = SeriesCoord {
                x: self.reader.read_i32::<LittleEndian>().map_err(eof)?,
                y: self.reader.read_i32::<LittleEndian>().map_err(eof)?,
                dm: self.reader.read_f32::<LittleEndian>().map_err(eof)?,
            };
            values.extend(read_f32s(&mut self.reader, header.buffer_size).map_err(eof)?);
            if series_index.insert(coord, i_series).is_some() {
                trace!("Batch {batch_id}: series coordinate {coord:?} appears more than once; keeping the last");
            }
        }
        let series = Array2::from_shape_vec((header.n_series, header.buffer_size), values)
            .map_err(|_| CandidateReadError::BadHeader {
                block,
                field: "buffer_size",
                value: header.buffer_size as i32,
            })?;

        self.accumulated_samples += header.buffer_size as i64;
        self.next_batch_id += 1;

        Ok(Some(SeriesBatch {
            batch_id,
            header,
            candidates,
            series_index,
            series,
        }))
    }
}

impl<R: Read> Iterator for CandidateReader<R> {
    type Item = Result<SeriesBatch, CandidateReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
