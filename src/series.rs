//! The paired timestamp/biomass arrays that every other stage operates on.
//!
//! Missing observations are carried as NaN values on a kept timestamp rather
//! than dropped rows, so gap lengths stay measurable after resampling.
use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

/// All the ways constructing a [`TimeSeries`] can fail
#[derive(Debug, Clone, Error)]
pub enum SeriesError {
    #[error("The time and value arrays do not match in length ({times} times, {values} values)")]
    LengthMismatch { times: usize, values: usize },
    #[error("The time array is not sorted in ascending order")]
    TimesNotSorted,
    #[error("The series contains no observations")]
    Empty,
}

/// Check if the timestamps in `it` are monotonically ascending or flat
pub fn is_increasing(it: &[NaiveDateTime]) -> bool {
    it.windows(2).all(|w| w[0] <= w[1])
}

/// Build a regular timestamp axis from `start` up to (and including) `end`,
/// spaced `step` apart.
pub fn time_grid(start: NaiveDateTime, end: NaiveDateTime, step: Duration) -> Vec<NaiveDateTime> {
    let mut grid = Vec::new();
    let mut t = start;
    while t <= end {
        grid.push(t);
        t = t + step;
    }
    grid
}

/// A biomass time series for a single taxon at a single sampling resolution.
///
/// `values[i]` is the biovolume observed at `times[i]`; NaN marks a kept
/// timestamp with no usable observation.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    pub times: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new series, validating that the arrays pair up and that the
    /// time axis ascends.
    pub fn new(times: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if times.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        if times.is_empty() {
            return Err(SeriesError::Empty);
        }
        if !is_increasing(&times) {
            return Err(SeriesError::TimesNotSorted);
        }
        Ok(Self { times, values })
    }

    /// Create a series without validating. The caller asserts the arrays
    /// pair up and ascend.
    pub fn wrap(times: Vec<NaiveDateTime>, values: Vec<f64>) -> Self {
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<(NaiveDateTime, f64)> {
        let t = self.times.get(i)?;
        Some((*t, self.values[i]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, &f64)> {
        self.times.iter().zip(self.values.iter())
    }

    /// The number of finite (observed) values.
    pub fn count_finite(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    /// Elapsed hours from the first timestamp to each timestamp, as a
    /// numeric axis for integration.
    pub fn hours_since_start(&self) -> Vec<f64> {
        match self.times.first() {
            Some(start) => self
                .times
                .iter()
                .map(|t| (*t - *start).num_seconds() as f64 / 3600.0)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Minimum and maximum over the finite values, or `None` if every value
    /// is missing.
    pub fn minmax_finite(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for v in self.values.iter().copied().filter(|v| v.is_finite()) {
            seen = true;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        seen.then_some((min, max))
    }

    /// Trapezoidal integral of `values` over elapsed hours between the
    /// sample indices `start` and `stop` (inclusive), skipping segments
    /// that touch a missing value.
    pub fn integrate_trapz(&self, start: usize, stop: usize) -> f64 {
        let hours = self.hours_since_start();
        let stop = stop.min(self.len().saturating_sub(1));
        if start >= stop {
            return 0.0;
        }
        (start..stop)
            .filter(|&i| self.values[i].is_finite() && self.values[i + 1].is_finite())
            .map(|i| {
                let delta = hours[i + 1] - hours[i];
                delta * 0.5 * (self.values[i + 1] + self.values[i])
            })
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 6, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_validates() {
        let err = TimeSeries::new(vec![hour(0)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, SeriesError::LengthMismatch { .. }));

        let err = TimeSeries::new(vec![hour(2), hour(1)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, SeriesError::TimesNotSorted));

        let err = TimeSeries::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, SeriesError::Empty));
    }

    #[test]
    fn test_time_grid() {
        let grid = time_grid(hour(0), hour(6), Duration::hours(2));
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[3], hour(6));
    }

    #[test]
    fn test_integrate_trapz_skips_missing() {
        let series = TimeSeries::new(
            vec![hour(0), hour(1), hour(2), hour(3)],
            vec![2.0, 4.0, f64::NAN, 4.0],
        )
        .unwrap();
        // Only the 0-1 segment is fully observed
        assert!((series.integrate_trapz(0, 3) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_minmax_finite() {
        let series = TimeSeries::new(
            vec![hour(0), hour(1), hour(2)],
            vec![f64::NAN, 3.0, 1.0],
        )
        .unwrap();
        assert_eq!(series.minmax_finite(), Some((1.0, 3.0)));
        let empty = TimeSeries::wrap(vec![hour(0)], vec![f64::NAN]);
        assert_eq!(empty.minmax_finite(), None);
    }
}
