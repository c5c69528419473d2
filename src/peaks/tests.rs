use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;

#[test]
fn test_robust_flags_outlier() {
    let result = find_peaks(&[1.0, 1.0, 1.0, 1.0, 100.0], Estimator::Robust, DEFAULT_SNR).unwrap();
    assert_eq!(result.candidates, [(4, 100.0)]);
    assert_eq!(result.baseline, [1.0; 5]);
    assert_eq!(result.raw.len(), 5);
}

#[test]
fn test_robust_uses_truncated_quartiles() {
    // sorted: 0 1 2 3 4 5 6 7; q1 = sorted[2], q3 = sorted[6], median =
    // sorted[4]
    let series = [7.0, 3.0, 0.0, 5.0, 1.0, 6.0, 2.0, 4.0];
    let result = find_peaks(&series, Estimator::Robust, 0.5).unwrap();
    assert_abs_diff_eq!(result.baseline[0], 4.0);
    // scale = 4 / 1.35; flagged when v - 4 >= 0.5 * 4 / 1.35 = 1.48
    let flagged: Vec<usize> = result.candidates.iter().map(|&(t, _)| t).collect();
    assert_eq!(flagged, [0, 5]);
}

#[test]
fn test_robust_single_sample() {
    let result = find_peaks(&[3.0], Estimator::Robust, DEFAULT_SNR).unwrap();
    assert!(result.candidates.is_empty());
    assert_eq!(result.baseline, [3.0]);
}

#[test]
fn test_running_mean_constant_series() {
    let result = find_peaks(
        &[5.0, 5.0, 5.0, 5.0],
        Estimator::RunningMean {
            alpha: DEFAULT_ALPHA,
        },
        2.0,
    )
    .unwrap();
    assert!(result.candidates.is_empty());
    assert_eq!(result.raw.len(), 4);
    assert_eq!(result.baseline.len(), 3);
    for b in result.baseline {
        assert_abs_diff_eq!(b, 5.0, epsilon = 1e-12);
    }
}

#[test]
fn test_running_mean_baseline_is_tested_before_update() {
    let result = find_peaks(
        &[1.0, -10.0, 1.0],
        Estimator::RunningMean { alpha: 0.5 },
        5.0,
    )
    .unwrap();
    // Sample 1 is tested against the seed only.
    assert_eq!(result.candidates, [(1, 10.0)]);
    assert_eq!(result.raw, [1.0, 10.0, 1.0]);
    assert_abs_diff_eq!(result.baseline[0], 1.0);
    assert_abs_diff_eq!(result.baseline[1], 5.5);
}

#[test]
fn test_running_mean_zero_seed() {
    let result = find_peaks(
        &[0.0, 0.0, 2.0],
        Estimator::RunningMean { alpha: 0.9 },
        5.0,
    )
    .unwrap();
    assert_eq!(result.candidates, [(2, 2.0)]);
}

#[test]
fn test_mean_std() {
    let mut series = vec![1.0; 20];
    series[10] = 50.0;
    let result = find_peaks(&series, Estimator::MeanStd, 3.0).unwrap();
    assert_eq!(result.candidates, [(10, 50.0)]);
    assert_abs_diff_eq!(result.baseline[0], 69.0 / 20.0, epsilon = 1e-12);

    assert_eq!(
        find_peaks(&[1.0], Estimator::MeanStd, 3.0),
        Err(PeakError::TooShort {
            estimator: "mean-std",
            needed: 2,
            got: 1
        })
    );
}

#[test]
fn test_empty_series() {
    for estimator in [
        Estimator::Robust,
        Estimator::RunningMean { alpha: 0.9 },
        Estimator::MeanStd,
    ] {
        assert_eq!(
            find_peaks(&[], estimator, DEFAULT_SNR),
            Err(PeakError::EmptyTimeSeries)
        );
    }
}

#[test]
fn test_estimator_from_str() {
    assert_eq!("robust".parse::<Estimator>().unwrap(), Estimator::Robust);
    assert_eq!(
        "Running-Mean".parse::<Estimator>().unwrap(),
        Estimator::RunningMean {
            alpha: DEFAULT_ALPHA
        }
    );
    assert_eq!("simple".parse::<Estimator>().unwrap(), Estimator::MeanStd);
    assert!(matches!(
        "median".parse::<Estimator>(),
        Err(PeakError::UnknownEstimator(_))
    ));
}

#[test]
fn test_find_peaks_in_table() {
    let mut data = Array4::from_elem((2, 2, 3, 5), 1.0);
    data[(1, 0, 2, 3)] = 100.0;
    let table = TimeSeriesTable { index: 0, data };

    let results = find_peaks_in_table(&table, 1, 0, Estimator::Robust, DEFAULT_SNR).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].1.candidates.is_empty());
    assert!(results[1].1.candidates.is_empty());
    assert_eq!(results[2].0, 2);
    assert_eq!(results[2].1.candidates, [(3, 100.0)]);

    assert_eq!(
        find_peaks_in_table(&table, 2, 0, Estimator::Robust, DEFAULT_SNR),
        Err(PeakError::PixelOutOfRange { x: 2, y: 0, side: 2 })
    );
}
