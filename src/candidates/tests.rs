use std::io::{Cursor, Write};

use approx::assert_abs_diff_eq;
use byteorder::{LittleEndian, WriteBytesExt};

use super::*;

/// (x, y, dm, time_step, peak, mean, std)
type RawCandidate = (i32, i32, f32, i32, f32, f32, f32);

fn write_batch(
    buf: &mut Vec<u8>,
    format: CandidateFormat,
    header: [i32; 4],
    candidates: &[RawCandidate],
    series: &[((i32, i32, f32), Vec<f32>)],
) {
    for h in header {
        buf.write_i32::<LittleEndian>(h).unwrap();
    }
    buf.write_i32::<LittleEndian>(candidates.len() as i32).unwrap();
    if format == CandidateFormat::Series {
        buf.write_i32::<LittleEndian>(series.len() as i32).unwrap();
    }
    for &(x, y, dm, t, peak, mean, std) in candidates {
        buf.write_i32::<LittleEndian>(x).unwrap();
        buf.write_i32::<LittleEndian>(y).unwrap();
        buf.write_f32::<LittleEndian>(dm).unwrap();
        buf.write_i32::<LittleEndian>(t).unwrap();
        buf.write_f32::<LittleEndian>(peak).unwrap();
        buf.write_f32::<LittleEndian>(mean).unwrap();
        buf.write_f32::<LittleEndian>(std).unwrap();
    }
    if format == CandidateFormat::Series {
        for ((x, y, dm), values) in series {
            buf.write_i32::<LittleEndian>(*x).unwrap();
            buf.write_i32::<LittleEndian>(*y).unwrap();
            buf.write_f32::<LittleEndian>(*dm).unwrap();
            for &v in values {
                buf.write_f32::<LittleEndian>(v).unwrap();
            }
        }
    }
}

fn read_all(bytes: Vec<u8>, format: CandidateFormat, offset: TimeOffset) -> Vec<SeriesBatch> {
    CandidateReader::new(Cursor::new(bytes), format, offset)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn two_batch_file() -> Vec<u8> {
    let mut bytes = vec![];
    // global_offset, side_size, n_dms, buffer_size
    write_batch(
        &mut bytes,
        CandidateFormat::Series,
        [0, 128, 10, 4],
        &[
            (5, 6, 2.0, 1, 10.0, 1.0, 1.5),
            (7, 8, 3.0, 3, 4.0, 1.0, 1.0),
        ],
        &[((5, 6, 2.0), vec![1.0, 10.0, 2.0, 1.5])],
    );
    write_batch(
        &mut bytes,
        CandidateFormat::Series,
        [4, 128, 10, 4],
        &[(1, 2, 0.0, 2, 20.0, 2.0, 2.0)],
        &[
            ((1, 2, 0.0), vec![2.0, 2.0, 20.0, 2.0]),
            ((9, 9, 9.0), vec![0.0; 4]),
        ],
    );
    bytes
}

#[test]
fn test_single_batch() {
    let mut bytes = vec![];
    write_batch(
        &mut bytes,
        CandidateFormat::Series,
        [100, 64, 5, 4],
        &[
            (1, 2, 3.0, 0, 5.0, 1.0, 1.0),
            (4, 5, 6.0, 2, 7.0, 1.0, 2.0),
        ],
        &[((1, 2, 3.0), vec![0.5, 1.5, 2.5, 3.5])],
    );
    let batches = read_all(bytes, CandidateFormat::Series, TimeOffset::HeaderGlobalOffset);
    assert_eq!(batches.len(), 1);

    let batch = &batches[0];
    assert_eq!(batch.batch_id, 0);
    assert_eq!(
        batch.header,
        BatchHeader {
            global_offset: 100,
            side_size: 64,
            n_dms: 5,
            buffer_size: 4,
            n_candidates: 2,
            n_series: 1
        }
    );
    let ids: Vec<u64> = batch.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 1]);
    assert_eq!(batch.series.dim(), (1, 4));

    let c = batch.candidates[1];
    assert_eq!((c.x, c.y), (4, 5));
    assert_abs_diff_eq!(c.dm, 6.0);
    assert_eq!(c.local_time_step, 2);
    assert_eq!(c.time_step, 102);
    assert_abs_diff_eq!(c.snr(), 3.0);

    let series = batch.series_at(batch.candidates[0].coord()).unwrap();
    assert_eq!(series.to_vec(), [0.5, 1.5, 2.5, 3.5]);
    assert!(batch.series_at(c.coord()).is_none());

    let times = batch.time_axis(0.02);
    assert_eq!(times.len(), 4);
    assert_abs_diff_eq!(times[0], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(times[3], 2.06, epsilon = 1e-12);
}

#[test]
fn test_ids_run_across_batches() {
    let batches = read_all(
        two_batch_file(),
        CandidateFormat::Series,
        TimeOffset::HeaderGlobalOffset,
    );
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].batch_id, 1);
    assert_eq!(batches[1].candidates[0].id, 2);
    assert_eq!(batches[1].candidates[0].batch_id, 1);
    assert_eq!(batches[1].series.dim(), (2, 4));
    assert_eq!(batches[1].series_index.len(), 2);
}

#[test]
fn test_time_offset_conventions() {
    // The second batch claims a global offset of 50, but the first batch only
    // held 4 samples.
    let mut bytes = vec![];
    write_batch(
        &mut bytes,
        CandidateFormat::Series,
        [0, 16, 1, 4],
        &[(0, 0, 0.0, 1, 1.0, 0.0, 1.0)],
        &[],
    );
    write_batch(
        &mut bytes,
        CandidateFormat::Series,
        [50, 16, 1, 4],
        &[(0, 0, 0.0, 3, 1.0, 0.0, 1.0)],
        &[],
    );

    let header = read_all(
        bytes.clone(),
        CandidateFormat::Series,
        TimeOffset::HeaderGlobalOffset,
    );
    assert_eq!(header[0].candidates[0].time_step, 1);
    assert_eq!(header[1].candidates[0].time_step, 53);

    let accumulated = read_all(
        bytes,
        CandidateFormat::Series,
        TimeOffset::AccumulatedBufferSize,
    );
    assert_eq!(accumulated[0].candidates[0].time_step, 1);
    assert_eq!(accumulated[1].candidates[0].time_step, 7);
}

#[test]
fn test_legacy_format() {
    let mut bytes = vec![];
    write_batch(
        &mut bytes,
        CandidateFormat::Legacy,
        [0, 32, 2, 8],
        &[(3, 4, 1.0, 5, 9.0, 1.0, 2.0)],
        &[],
    );
    write_batch(
        &mut bytes,
        CandidateFormat::Legacy,
        [8, 32, 2, 8],
        &[(3, 4, 1.0, 0, 9.0, 1.0, 2.0), (1, 1, 0.0, 7, 2.0, 1.0, 2.0)],
        &[],
    );
    assert_eq!(bytes.len(), 2 * 20 + 3 * 28);

    let batches = read_all(bytes, CandidateFormat::Legacy, TimeOffset::default());
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].header.n_series, 0);
    assert_eq!(batches[0].series.dim(), (0, 8));
    assert_eq!(batches[1].candidates[1].id, 2);
    assert_eq!(batches[1].candidates[1].time_step, 15);
}

#[test]
fn test_legacy_bytes_read_as_series_are_misinterpreted_not_silently_accepted() {
    // A legacy file read in series mode consumes the first candidate's x as
    // `n_series`; with a negative x this is caught as a bad header.
    let mut bytes = vec![];
    write_batch(
        &mut bytes,
        CandidateFormat::Legacy,
        [0, 32, 2, 8],
        &[(-3, 4, 1.0, 5, 9.0, 1.0, 2.0)],
        &[],
    );
    let result: Result<Vec<_>, _> =
        CandidateReader::new(Cursor::new(bytes), CandidateFormat::Series, TimeOffset::default())
            .collect();
    assert!(matches!(
        result,
        Err(CandidateReadError::BadHeader {
            block: 0,
            field: "n_series",
            value: -3
        })
    ));
}

#[test]
fn test_empty_stream() {
    let batches = read_all(vec![], CandidateFormat::Series, TimeOffset::default());
    assert!(batches.is_empty());
}

#[test]
fn test_truncated_header() {
    let mut bytes = two_batch_file();
    bytes.extend_from_slice(&[1, 0, 0, 0, 2, 0]);
    let mut reader = CandidateReader::new(
        Cursor::new(bytes),
        CandidateFormat::Series,
        TimeOffset::default(),
    );
    assert!(reader.next().unwrap().is_ok());
    assert!(reader.next().unwrap().is_ok());
    assert!(matches!(
        reader.next(),
        Some(Err(CandidateReadError::Truncated {
            block: 2,
            section: "header"
        }))
    ));
    assert!(reader.next().is_none());
}

#[test]
fn test_truncated_candidates_and_series() {
    let full = two_batch_file();
    // The first batch: 24 header bytes + 2 * 28 candidate bytes + 12 + 16
    // series bytes.
    let first_batch_len = 24 + 2 * 28 + 12 + 4 * 4;

    let cut = full[..24 + 28 + 10].to_vec();
    let result: Result<Vec<_>, _> =
        CandidateReader::new(Cursor::new(cut), CandidateFormat::Series, TimeOffset::default())
            .collect();
    assert!(matches!(
        result,
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "candidates"
        })
    ));

    let cut = full[..first_batch_len - 1].to_vec();
    let result: Result<Vec<_>, _> =
        CandidateReader::new(Cursor::new(cut), CandidateFormat::Series, TimeOffset::default())
            .collect();
    assert!(matches!(
        result,
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "series"
        })
    ));

    // Cutting exactly at the batch boundary is fine.
    let cut = full[..first_batch_len].to_vec();
    assert_eq!(
        read_all(cut, CandidateFormat::Series, TimeOffset::default()).len(),
        1
    );
}

#[test]
fn test_oversized_counts_are_truncation_errors() {
    let read_first = |header: [i32; 6], payload: &[u8]| {
        let mut bytes = vec![];
        for h in header {
            bytes.write_i32::<LittleEndian>(h).unwrap();
        }
        bytes.extend_from_slice(payload);
        CandidateReader::new(
            Cursor::new(bytes),
            CandidateFormat::Series,
            TimeOffset::default(),
        )
        .next()
        .unwrap()
    };

    // A lone header that declares enormous series.
    assert!(matches!(
        read_first([0, 16, 1, i32::MAX, 0, i32::MAX], &[]),
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "series"
        })
    ));

    // One coordinate and a couple of samples of a huge series.
    let mut payload = vec![];
    payload.write_i32::<LittleEndian>(3).unwrap();
    payload.write_i32::<LittleEndian>(4).unwrap();
    payload.write_f32::<LittleEndian>(5.0).unwrap();
    payload.write_f32::<LittleEndian>(1.0).unwrap();
    payload.write_f32::<LittleEndian>(2.0).unwrap();
    assert!(matches!(
        read_first([0, 16, 1, i32::MAX, 0, 1], &payload),
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "series"
        })
    ));

    assert!(matches!(
        read_first([0, 16, 1, 4, i32::MAX, 0], &[0; 30]),
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "candidates"
        })
    ));

    // Empty series with a huge buffer size are still fine.
    let batch = read_first([0, 16, 1, i32::MAX, 0, 0], &[]).unwrap();
    assert_eq!(batch.series.dim(), (0, i32::MAX as usize));
}

#[test]
fn test_snr_filter() {
    let batches = read_all(
        two_batch_file(),
        CandidateFormat::Series,
        TimeOffset::default(),
    );
    let all: Vec<Candidate> = batches
        .iter()
        .flat_map(|b| b.candidates.iter().copied())
        .collect();
    // SNRs: 6, 3, 9

    let unfiltered = filter_candidates(&all, SnrFilter::from_threshold(-1.0));
    assert_eq!(unfiltered, all);
    assert_eq!(SnrFilter::from_threshold(SnrFilter::NO_FILTER), SnrFilter::All);

    let filtered = filter_candidates(&all, SnrFilter::from_threshold(5.0));
    let ids: Vec<u64> = filtered.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 2]);

    // Thresholds are inclusive.
    let filtered = filter_candidates(&all, SnrFilter::AtLeast(3.0));
    assert_eq!(filtered.len(), 3);
}

#[test]
fn test_candidate_set_from_file() {
    let mut tmp = tempfile::NamedTempFile::new().expect("Couldn't make tmp file");
    tmp.write_all(&two_batch_file()).unwrap();
    tmp.flush().unwrap();

    let file = CandidateFile::new(
        tmp.path(),
        CandidateFormat::Series,
        TimeOffset::HeaderGlobalOffset,
    );
    let set = CandidateSet::read(&file).unwrap();
    assert_eq!(set.batches.len(), 2);
    assert_eq!(set.num_candidates(), 3);
    assert_eq!(set.side_size(), Some(128));

    let c = *set.find(2).unwrap();
    assert_eq!(c.time_step, 6);
    let series = set.series_of(&c).unwrap();
    assert_eq!(series.to_vec(), [2.0, 2.0, 20.0, 2.0]);
    // Candidate 1 has no saved series.
    assert!(set.series_of(set.find(1).unwrap()).is_none());
    assert!(set.find(3).is_none());

    let strong = set.filtered(SnrFilter::AtLeast(8.0));
    assert_eq!(strong.len(), 1);
    assert_eq!(strong[0].id, 2);

    // The file can be read again from the start.
    let again: Vec<_> = file.batches().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(again[0].candidates[0].id, 0);
}

#[test]
fn test_series_coord_hashing() {
    let mut map = HashMap::new();
    map.insert(SeriesCoord { x: 1, y: 2, dm: 0.5 }, 0);
    assert_eq!(map.get(&SeriesCoord { x: 1, y: 2, dm: 0.5 }), Some(&0));
    assert_eq!(map.get(&SeriesCoord { x: 1, y: 2, dm: 0.25 }), None);
}

#[test]
fn test_time_offset_from_str() {
    assert_eq!(
        "header".parse::<TimeOffset>().unwrap(),
        TimeOffset::HeaderGlobalOffset
    );
    assert_eq!(
        "Accumulated".parse::<TimeOffset>().unwrap(),
        TimeOffset::AccumulatedBufferSize
    );
    assert!("sideways".parse::<TimeOffset>().is_err());
}

fn write_time_series_block(buf: &mut Vec<u8>, side: i32, n_dms: i32, n_samples: i32, start: f32) {
    buf.write_i32::<LittleEndian>(side).unwrap();
    buf.write_i32::<LittleEndian>(n_dms).unwrap();
    buf.write_i32::<LittleEndian>(n_samples).unwrap();
    let n = side * side * n_dms * n_samples;
    for i in 0..n {
        buf.write_f32::<LittleEndian>(start + i as f32).unwrap();
    }
}

#[test]
fn test_time_series_reader() {
    let mut bytes = vec![];
    write_time_series_block(&mut bytes, 2, 3, 4, 0.0);
    write_time_series_block(&mut bytes, 2, 3, 4, 1000.0);

    let tables: Vec<TimeSeriesTable> = TimeSeriesReader::new(Cursor::new(bytes.clone()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].data.dim(), (2, 2, 3, 4));
    assert_eq!(tables[1].index, 1);
    assert_eq!(tables[0].num_dms(), 3);
    // C order: ((x * 2 + y) * 3 + dm) * 4 + t
    let s = tables[0].series(1, 0, 2).unwrap();
    assert_eq!(s.to_vec(), [32.0, 33.0, 34.0, 35.0]);
    assert!(tables[0].series(2, 0, 0).is_none());

    let series = pixel_series(
        TimeSeriesReader::new(Cursor::new(bytes)),
        &[0, 2],
        &[(0, 0), (1, 0)],
    )
    .unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(series[0], [0.0, 1.0, 2.0, 3.0, 1000.0, 1001.0, 1002.0, 1003.0]);
    assert_eq!(series[3].len(), 8);
    assert_abs_diff_eq!(series[3][0], 32.0);
}

#[test]
fn test_time_series_truncated() {
    let mut bytes = vec![];
    write_time_series_block(&mut bytes, 2, 1, 2, 0.0);
    bytes.truncate(bytes.len() - 2);
    let result: Result<Vec<_>, _> = TimeSeriesReader::new(Cursor::new(bytes)).collect();
    assert!(matches!(
        result,
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "data"
        })
    ));
}

#[test]
fn test_time_series_oversized_header() {
    let header_only = |dims: [i32; 3], payload: &[u8]| {
        let mut bytes = vec![];
        for d in dims {
            bytes.write_i32::<LittleEndian>(d).unwrap();
        }
        bytes.extend_from_slice(payload);
        TimeSeriesReader::new(Cursor::new(bytes)).next().unwrap()
    };

    // The element count overflows.
    assert!(matches!(
        header_only([i32::MAX; 3], &[]),
        Err(CandidateReadError::BadHeader { block: 0, .. })
    ));

    // Addressable, but far more than the file holds.
    assert!(matches!(
        header_only([1, 1, i32::MAX], &[0; 10]),
        Err(CandidateReadError::Truncated {
            block: 0,
            section: "data"
        })
    ));
}
