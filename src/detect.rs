//! Run-length bloom detection over a gap-filled biomass series.
//!
//! A bloom is a contiguous run of samples at or above the resolved threshold
//! that lasts at least the minimum bloom length. Short data outages are
//! bridged first so a missed upload inside a bloom does not split it in two.
use chrono::Duration;
use log::debug;
use thiserror::Error;

use crate::bloom::DetectedBloom;
use crate::fill::fill_short_gaps;
use crate::resample::Resolution;
use crate::series::{is_increasing, TimeSeries};
use crate::stats::median;

/// How the biomass threshold for a series is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// A fixed biovolume cutoff.
    Absolute(f64),
    /// `factor` times the median of the finite values, the baseline rule
    /// used when a taxon has no published cutoff.
    MedianMultiple(f64),
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::MedianMultiple(2.0)
    }
}

impl ThresholdPolicy {
    /// Resolve the policy against the observed values. Returns `None` when
    /// a median-relative policy has no finite values to take a median of.
    pub fn resolve(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Absolute(threshold) => Some(*threshold),
            Self::MedianMultiple(factor) => {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                median(&finite).map(|m| m * factor)
            }
        }
    }
}

/// All the ways bloom detection can fail
#[derive(Debug, Clone, Error)]
pub enum BloomDetectorError {
    #[error("The time and value arrays do not match in length")]
    LengthMismatch,
    #[error("The time axis is not sorted")]
    TimesNotSorted,
    #[error("The series contains no finite observations")]
    AllMissing,
}

/// A threshold bloom detector for one sampling resolution.
#[derive(Debug, Clone)]
pub struct BloomDetector {
    pub threshold: ThresholdPolicy,
    /// Longest data outage bridged before run scanning.
    pub max_fill_gap: Duration,
    /// Shortest first-to-last-sample span reported as a bloom.
    pub min_bloom_length: Duration,
}

impl Default for BloomDetector {
    fn default() -> Self {
        Self::for_resolution(Resolution::Hourly)
    }
}

/// A builder for configuring [`BloomDetector`]
#[derive(Debug, Default, Clone)]
pub struct BloomDetectorBuilder {
    threshold: ThresholdPolicy,
    max_fill_gap: Option<Duration>,
    min_bloom_length: Option<Duration>,
}

impl BloomDetectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold(mut self, threshold: ThresholdPolicy) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn max_fill_gap(mut self, max_fill_gap: Duration) -> Self {
        self.max_fill_gap = Some(max_fill_gap);
        self
    }

    pub fn min_bloom_length(mut self, min_bloom_length: Duration) -> Self {
        self.min_bloom_length = Some(min_bloom_length);
        self
    }

    pub fn build(self) -> BloomDetector {
        let defaults = BloomDetector::default();
        BloomDetector {
            threshold: self.threshold,
            max_fill_gap: self.max_fill_gap.unwrap_or(defaults.max_fill_gap),
            min_bloom_length: self.min_bloom_length.unwrap_or(defaults.min_bloom_length),
        }
    }
}

impl From<BloomDetectorBuilder> for BloomDetector {
    fn from(value: BloomDetectorBuilder) -> Self {
        value.build()
    }
}

impl BloomDetector {
    pub fn new(
        threshold: ThresholdPolicy,
        max_fill_gap: Duration,
        min_bloom_length: Duration,
    ) -> Self {
        Self {
            threshold,
            max_fill_gap,
            min_bloom_length,
        }
    }

    /// A detector preconfigured with `resolution`'s gap and length constants.
    pub fn for_resolution(resolution: Resolution) -> Self {
        Self {
            threshold: ThresholdPolicy::default(),
            max_fill_gap: resolution.max_fill_gap(),
            min_bloom_length: resolution.min_bloom_length(),
        }
    }

    fn validate(&self, series: &TimeSeries) -> Result<(), BloomDetectorError> {
        if series.times.len() != series.values.len() {
            return Err(BloomDetectorError::LengthMismatch);
        }
        if !is_increasing(&series.times) {
            return Err(BloomDetectorError::TimesNotSorted);
        }
        if series.count_finite() == 0 {
            return Err(BloomDetectorError::AllMissing);
        }
        Ok(())
    }

    /// Detect blooms in `series`, pushing them into `bloom_accumulator`.
    ///
    /// Returns the number of blooms found if successful.
    pub fn discover_blooms(
        &self,
        series: &TimeSeries,
        bloom_accumulator: &mut Vec<DetectedBloom>,
    ) -> Result<usize, BloomDetectorError> {
        self.validate(series)?;
        let m = bloom_accumulator.len();

        let mut filled_series = series.clone();
        let filled_indices = fill_short_gaps(&mut filled_series, self.max_fill_gap);

        // The threshold is taken over observed values only, so filling
        // cannot move the baseline.
        let threshold = self
            .threshold
            .resolve(&series.values)
            .ok_or(BloomDetectorError::AllMissing)?;
        debug!("resolved bloom threshold to {threshold:0.4}");

        let n = filled_series.len();
        let mut next_id = 1u32;
        let mut run_start: Option<usize> = None;

        for index in 0..=n {
            let above = index < n
                && filled_series.values[index].is_finite()
                && filled_series.values[index] >= threshold;
            match (run_start, above) {
                (None, true) => run_start = Some(index),
                (Some(start), false) => {
                    // Run closed at the previous sample, which is also how a
                    // series that ends mid-bloom terminates.
                    let stop = index - 1;
                    if let Some(bloom) =
                        self.measure_run(&filled_series, &filled_indices, start, stop, next_id)
                    {
                        bloom_accumulator.push(bloom);
                        next_id += 1;
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        Ok(bloom_accumulator.len() - m)
    }

    /// Detect blooms in `series`, returning them as a fresh list.
    ///
    /// This is a thin wrapper around [`BloomDetector::discover_blooms`].
    pub fn detect_blooms(
        &self,
        series: &TimeSeries,
    ) -> Result<Vec<DetectedBloom>, BloomDetectorError> {
        let mut acc = Vec::new();
        self.discover_blooms(series, &mut acc)?;
        Ok(acc)
    }

    fn measure_run(
        &self,
        series: &TimeSeries,
        filled_indices: &[usize],
        start: usize,
        stop: usize,
        id: u32,
    ) -> Option<DetectedBloom> {
        let span = series.times[stop] - series.times[start];
        if span < self.min_bloom_length {
            debug!(
                "dropping above-threshold run of {} hours at {}",
                span.num_hours(),
                series.times[start]
            );
            return None;
        }

        let mut peak_index = start;
        let mut sum = 0.0;
        for i in start..=stop {
            sum += series.values[i];
            if series.values[i] > series.values[peak_index] {
                peak_index = i;
            }
        }
        let n_samples = stop - start + 1;
        let n_filled = filled_indices
            .iter()
            .filter(|&&i| start <= i && i <= stop)
            .count();

        Some(DetectedBloom {
            id,
            start: series.times[start],
            end: series.times[stop],
            peak_time: series.times[peak_index],
            peak_value: series.values[peak_index],
            mean_value: sum / n_samples as f64,
            integrated: series.integrate_trapz(start, stop),
            n_samples,
            n_filled,
        })
    }
}

/// A convenience function that detects blooms with `resolution`'s preset
/// detector.
pub fn detect_blooms(
    series: &TimeSeries,
    resolution: Resolution,
) -> Result<Vec<DetectedBloom>, BloomDetectorError> {
    BloomDetector::for_resolution(resolution).detect_blooms(series)
}
