use std::fmt;

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A contiguous above-threshold interval found by
/// [`BloomDetector`](crate::detect::BloomDetector), with the measurements the
/// summary tables report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedBloom {
    /// Sequential peak ID within one detection pass, starting at 1.
    pub id: u32,
    /// Timestamp of the first above-threshold sample.
    pub start: NaiveDateTime,
    /// Timestamp of the last above-threshold sample.
    pub end: NaiveDateTime,
    /// Timestamp of the maximum value inside the interval.
    pub peak_time: NaiveDateTime,
    pub peak_value: f64,
    pub mean_value: f64,
    /// Trapezoidal biovolume integral over the interval, in value-hours.
    pub integrated: f64,
    /// Samples inside the interval.
    pub n_samples: usize,
    /// How many of those samples were gap-filled rather than observed.
    pub n_filled: usize,
}

impl DetectedBloom {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn year(&self) -> i32 {
        self.peak_time.year()
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for DetectedBloom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DetectedBloom({}, {} .. {}, peak {:.4} @ {})",
            self.id, self.start, self.end, self.peak_value, self.peak_time
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_duration_and_contains() {
        let start = NaiveDate::from_ymd_opt(2018, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = start + Duration::hours(72);
        let bloom = DetectedBloom {
            id: 1,
            start,
            end,
            peak_time: start + Duration::hours(36),
            peak_value: 10.0,
            mean_value: 6.0,
            integrated: 432.0,
            n_samples: 73,
            n_filled: 2,
        };
        assert_eq!(bloom.duration(), Duration::hours(72));
        assert_eq!(bloom.year(), 2018);
        assert!(bloom.contains(start + Duration::hours(10)));
        assert!(!bloom.contains(end + Duration::hours(1)));
    }
}
