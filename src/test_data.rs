//! Synthetic fixtures shared by the module tests.
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::series::TimeSeries;

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// An hourly series starting at [`base_time`].
pub fn hourly_series(values: &[f64]) -> TimeSeries {
    let start = base_time();
    let times = (0..values.len() as i64)
        .map(|i| start + Duration::hours(i))
        .collect();
    TimeSeries::wrap(times, values.to_vec())
}

/// A 384-hour profile: a 1.0 baseline carrying two sustained bloom plateaus
/// (72 h at 9.0 from hour 48, 96 h at 8.0 from hour 216) and one 2-hour
/// spike at 20.0 that is too short to count. The plateaus start on day
/// boundaries so they survive daily rebinning intact, and baseline hours
/// outnumber bloom hours so the profile median is the baseline value.
pub fn two_bloom_profile() -> Vec<f64> {
    let mut profile = Vec::with_capacity(384);
    profile.extend(vec![1.0; 48]);
    profile.extend(vec![9.0; 72]);
    profile.extend(vec![1.0; 48]);
    profile.extend(vec![20.0; 2]);
    profile.extend(vec![1.0; 46]);
    profile.extend(vec![8.0; 96]);
    profile.extend(vec![1.0; 72]);
    profile
}
