//! `bloomsignal` is a library for detecting phytoplankton blooms in biomass
//! time series and comparing how well coarser sampling resolutions (daily
//! aggregates, satellite products, weekly microscopy) reproduce the blooms
//! seen by hourly imaging.
//!
//! The detection facility can be used directly with [`BloomDetector`], which
//! gap-fills short data outages and run-length encodes the samples at or
//! above a biomass threshold. The gap window, minimum bloom length, and
//! default smoothing come from [`Resolution`] presets; see its documentation
//! for the constants.
//!
//! Irregular observations are first placed on a regular grid with
//! [`crate::resample::Rebinner`], and the [`crate::pipeline`] module strings
//! the whole analysis together for the batch binary.
//!
//! # Usage
//! ```
//! use chrono::{Duration, NaiveDate};
//! use bloomsignal::{BloomDetector, Resolution, ThresholdPolicy, TimeSeries};
//!
//! let start = NaiveDate::from_ymd_opt(2018, 6, 1)
//!     .unwrap()
//!     .and_hms_opt(0, 0, 0)
//!     .unwrap();
//! let times: Vec<_> = (0..96).map(|i| start + Duration::hours(i)).collect();
//! let values: Vec<f64> = (0..96)
//!     .map(|i| if (24..80).contains(&i) { 9.0 } else { 1.0 })
//!     .collect();
//! let series = TimeSeries::new(times, values).unwrap();
//!
//! let detector = BloomDetector {
//!     threshold: ThresholdPolicy::Absolute(5.0),
//!     ..BloomDetector::for_resolution(Resolution::Hourly)
//! };
//! let blooms = detector.detect_blooms(&series).unwrap();
//! assert_eq!(blooms.len(), 1);
//! for bloom in blooms.iter() {
//!     println!("{}", bloom);
//! }
//! ```
pub mod bloom;
pub mod config;
pub mod corrections;
pub mod csv_io;
pub mod detect;
pub mod fill;
pub mod pipeline;
pub mod resample;
pub mod series;
pub mod smooth;
pub mod stats;

#[cfg(feature = "mysql")]
pub mod db;
#[cfg(feature = "netcdf")]
pub mod netcdf_io;
#[cfg(feature = "plot")]
pub mod plot;

#[cfg(test)]
mod test_data;

pub use crate::bloom::DetectedBloom;
pub use crate::detect::{
    detect_blooms, BloomDetector, BloomDetectorBuilder, BloomDetectorError, ThresholdPolicy,
};
pub use crate::resample::{BinStatistic, Rebinner, Resolution};
pub use crate::series::TimeSeries;
