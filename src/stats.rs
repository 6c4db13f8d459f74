//! Numeric helpers and the cross-resolution detection accuracy report.
use chrono::Duration;
use num_traits::{Float, FromPrimitive, ToPrimitive};

use crate::bloom::DetectedBloom;

pub fn _isclose<T>(x: T, y: T, rtol: T, atol: T) -> bool
where
    T: Float,
{
    (x - y).abs() <= (atol + rtol * y.abs())
}

pub fn isclose<T>(x: T, y: T) -> bool
where
    T: Float + FromPrimitive,
{
    _isclose(x, y, T::from_f64(1e-5).unwrap(), T::from_f64(1e-8).unwrap())
}

pub fn aboutzero<T>(x: T) -> bool
where
    T: Float + FromPrimitive,
{
    isclose(x, T::zero())
}

pub fn minmax<T: Float>(values: &[T]) -> (T, T) {
    let mut max = -T::infinity();
    let mut min = T::infinity();

    for v in values.iter() {
        if *v > max {
            max = *v;
        }
        if *v < min {
            min = *v
        }
    }
    (min, max)
}

/// Interpolated percentile over an already sorted slice.
pub fn percentile<T: Float + ToPrimitive>(values: &[T], percent: f64) -> T {
    let k = (values.len() - 1) as f64 * percent;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return values[k as usize];
    }
    let d0 = values[f as usize] * T::from(c - k).unwrap();
    let d1 = values[c as usize] * T::from(k - f).unwrap();
    d0 + d1
}

/// Median of the finite entries of `values`, or `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());
    Some(percentile(&finite, 0.5))
}

/// One coarse-resolution bloom paired with its hourly reference bloom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomMatch {
    pub reference_id: u32,
    pub candidate_id: u32,
    /// Candidate peak time minus reference peak time, in hours.
    pub peak_offset_hours: f64,
    /// Candidate peak magnitude over reference peak magnitude.
    pub magnitude_ratio: f64,
}

/// The outcome of matching one resolution's blooms against the reference.
#[derive(Debug, Default, Clone)]
pub struct BloomMatchReport {
    pub matches: Vec<BloomMatch>,
    pub n_reference: usize,
    pub n_candidate: usize,
}

impl BloomMatchReport {
    pub fn true_positives(&self) -> usize {
        self.matches.len()
    }

    /// Candidate blooms with no reference counterpart.
    pub fn false_positives(&self) -> usize {
        self.n_candidate - self.matches.len()
    }

    /// Reference blooms the candidate resolution failed to see.
    pub fn misses(&self) -> usize {
        self.n_reference - self.matches.len()
    }

    pub fn precision(&self) -> f64 {
        if self.n_candidate == 0 {
            return 0.0;
        }
        self.true_positives() as f64 / self.n_candidate as f64
    }

    pub fn recall(&self) -> f64 {
        if self.n_reference == 0 {
            return 0.0;
        }
        self.true_positives() as f64 / self.n_reference as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    pub fn mean_abs_peak_offset_hours(&self) -> Option<f64> {
        if self.matches.is_empty() {
            return None;
        }
        let sum: f64 = self.matches.iter().map(|m| m.peak_offset_hours.abs()).sum();
        Some(sum / self.matches.len() as f64)
    }

    pub fn mean_magnitude_ratio(&self) -> Option<f64> {
        if self.matches.is_empty() {
            return None;
        }
        let sum: f64 = self.matches.iter().map(|m| m.magnitude_ratio).sum();
        Some(sum / self.matches.len() as f64)
    }
}

/// Match `candidate` blooms against `reference` blooms by peak-time
/// proximity.
///
/// Greedy one-to-one assignment: each candidate takes the nearest unclaimed
/// reference whose peak lies within `tolerance`. Candidates that claim
/// nothing are false positives; unclaimed references are misses.
pub fn match_blooms(
    reference: &[DetectedBloom],
    candidate: &[DetectedBloom],
    tolerance: Duration,
) -> BloomMatchReport {
    let mut claimed = vec![false; reference.len()];
    let mut matches = Vec::new();

    for cand in candidate {
        let mut best: Option<(usize, i64)> = None;
        for (i, reference_bloom) in reference.iter().enumerate() {
            if claimed[i] {
                continue;
            }
            let offset = (cand.peak_time - reference_bloom.peak_time).num_seconds().abs();
            if offset > tolerance.num_seconds() {
                continue;
            }
            if best.map_or(true, |(_, best_offset)| offset < best_offset) {
                best = Some((i, offset));
            }
        }
        if let Some((i, _)) = best {
            claimed[i] = true;
            matches.push(BloomMatch {
                reference_id: reference[i].id,
                candidate_id: cand.id,
                peak_offset_hours: (cand.peak_time - reference[i].peak_time).num_seconds() as f64
                    / 3600.0,
                magnitude_ratio: cand.peak_value / reference[i].peak_value,
            });
        }
    }

    BloomMatchReport {
        matches,
        n_reference: reference.len(),
        n_candidate: candidate.len(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::base_time;
    use chrono::NaiveDateTime;

    fn bloom_at(id: u32, peak_hour: i64, peak_value: f64) -> DetectedBloom {
        let peak: NaiveDateTime = base_time() + Duration::hours(peak_hour);
        DetectedBloom {
            id,
            start: peak - Duration::hours(24),
            end: peak + Duration::hours(24),
            peak_time: peak,
            peak_value,
            mean_value: peak_value / 2.0,
            integrated: peak_value * 24.0,
            n_samples: 49,
            n_filled: 0,
        }
    }

    #[test]
    fn test_isclose() {
        assert!(isclose(1.0, 1.0 + 1e-9));
        assert!(!isclose(1.0, 1.1));
        assert!(aboutzero(0.0));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_match_all_found() {
        let reference = vec![bloom_at(1, 100, 10.0), bloom_at(2, 400, 8.0)];
        let candidate = vec![bloom_at(1, 112, 9.0), bloom_at(2, 390, 9.6)];
        let report = match_blooms(&reference, &candidate, Duration::days(2));
        assert_eq!(report.true_positives(), 2);
        assert_eq!(report.false_positives(), 0);
        assert_eq!(report.misses(), 0);
        assert!((report.precision() - 1.0).abs() < 1e-9);
        assert!((report.recall() - 1.0).abs() < 1e-9);
        assert!((report.mean_abs_peak_offset_hours().unwrap() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_counts_misses_and_false_positives() {
        let reference = vec![bloom_at(1, 100, 10.0), bloom_at(2, 400, 8.0)];
        let candidate = vec![bloom_at(1, 104, 9.0), bloom_at(2, 900, 5.0)];
        let report = match_blooms(&reference, &candidate, Duration::days(2));
        assert_eq!(report.true_positives(), 1);
        assert_eq!(report.false_positives(), 1);
        assert_eq!(report.misses(), 1);
        assert!((report.precision() - 0.5).abs() < 1e-9);
        assert!((report.recall() - 0.5).abs() < 1e-9);
        assert!((report.f1() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_match_is_one_to_one() {
        let reference = vec![bloom_at(1, 100, 10.0)];
        let candidate = vec![bloom_at(1, 96, 9.0), bloom_at(2, 110, 9.0)];
        let report = match_blooms(&reference, &candidate, Duration::days(2));
        assert_eq!(report.true_positives(), 1);
        assert_eq!(report.false_positives(), 1);
    }

    #[test]
    fn test_magnitude_ratio() {
        let reference = vec![bloom_at(1, 100, 10.0)];
        let candidate = vec![bloom_at(1, 100, 5.0)];
        let report = match_blooms(&reference, &candidate, Duration::hours(1));
        assert!((report.mean_magnitude_ratio().unwrap() - 0.5).abs() < 1e-9);
    }
}
