//! Reading the older "time series dump" files, which contain every pixel's
//! dedispersed time series rather than just candidates.
//!
//! Each block is a header of three little-endian `i32`s (`side_size, n_dms,
//! buffer_size`) followed by `side_size^2 * n_dms * buffer_size` `f32`s in C
//! order (x, y, dm, time).

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use ndarray::prelude::*;

use super::{
    codec::{fill_or_eof, read_f32s},
    CandidateReadError,
};

/// One block of a time-series dump.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    pub index: usize,

    /// Shape (side_size, side_size, n_dms, buffer_size).
    pub data: Array4<f32>,
}

impl TimeSeriesTable {
    pub fn series(&self, x: usize, y: usize, dm: usize) -> Option<ArrayView1<f32>> {
        let (nx, ny, ndm, _) = self.data.dim();
        (x < nx && y < ny && dm < ndm).then(|| self.data.slice(s![x, y, dm, ..]))
    }

    pub fn num_dms(&self) -> usize {
        self.data.len_of(Axis(2))
    }
}

/// A forward-only iterator over the blocks of a time-series dump. Iteration
/// stops after the first error.
pub struct TimeSeriesReader<R: Read> {
    reader: R,
    next_index: usize,
    finished: bool,
}

impl TimeSeriesReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CandidateReadError> {
        debug!("Reading time series from {}", path.as_ref().display());
        Ok(TimeSeriesReader::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> TimeSeriesReader<R> {
    pub fn new(reader: R) -> TimeSeriesReader<R> {
        TimeSeriesReader {
            reader,
            next_index: 0,
            finished: false,
        }
    }

    fn read_table(&mut self) -> Result<Option<TimeSeriesTable>, CandidateReadError> {
        let block = self.next_index;
        let mut header = [0; 12];
        match fill_or_eof(&mut self.reader, &mut header)? {
            0 => return Ok(None),
            12 => (),
            _ => {
                return Err(CandidateReadError::Truncated {
                    block,
                    section: "header",
                })
            }
        }
        let mut dims = [0; 3];
        for (dim, (field, bytes)) in dims
            .iter_mut()
            .zip(["side_size", "n_dms", "buffer_size"].into_iter().zip(header.chunks_exact(4)))
        {
            let value = LittleEndian::read_i32(bytes);
            if value < 0 {
                return Err(CandidateReadError::BadHeader {
                    block,
                    field,
                    value,
                });
            }
            *dim = value as usize;
        }
        let [side_size, n_dms, buffer_size] = dims;
        trace!("Time series block {block}: side {side_size}, {n_dms} DMs, {buffer_size} samples");

        // The byte count of the block must be addressable.
        let mut num_values: usize = 1;
        for (field, dim) in [
            ("side_size", side_size),
            ("side_size", side_size),
            ("n_dms", n_dms),
            ("buffer_size", buffer_size),
        ] {
            num_values = num_values
                .checked_mul(dim)
                .filter(|&n| n <= isize::MAX as usize / std::mem::size_of::<f32>())
                .ok_or(CandidateReadError::BadHeader {
                    block,
                    field,
                    value: dim as i32,
                })?;
        }
        let values = read_f32s(&mut self.reader, num_values)
            .map_err(|e| CandidateReadError::from_io(e, block, "data"))?;
        let data = Array4::from_shape_vec((side_size, side_size, n_dms, buffer_size), values)
            .map_err(|_| CandidateReadError::BadHeader {
                block,
                field: "buffer_size",
                value: buffer_size as i32,
            })?;
        self.next_index += 1;

        Ok(Some(TimeSeriesTable { index: block, data }))
    }
}

impl<R: Read> Iterator for TimeSeriesReader<R> {
    type Item = Result<TimeSeriesTable, CandidateReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_table() {
            Ok(Some(table)) => Some(Ok(table)),
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

/// Concatenate the time series of each (DM, pixel) pair across all blocks of
/// a dump. The result is ordered DM-major: entry `i_dm * pixels.len() +
/// i_pixel`. Pixels or DMs outside of a block contribute nothing for that
/// block.
pub fn pixel_series<R: Read>(
    reader: TimeSeriesReader<R>,
    dms: &[usize],
    pixels: &[(usize, usize)],
) -> Result<Vec<Vec<f32>>, CandidateReadError> {
    let mut out = vec![vec![]; dms.len() * pixels.len()];
    for table in reader {
        let table = table?;
        for (i_dm, &dm) in dms.iter().enumerate() {
            for (i_pixel, &(x, y)) in pixels.iter().enumerate() {
                if let Some(series) = table.series(x, y, dm) {
                    out[i_dm * pixels.len() + i_pixel].extend(series.iter().copied());
                }
            }
        }
    }
    Ok(out)
}
