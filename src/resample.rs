//! Re-bin irregular observations onto the regular time grid of a sampling
//! resolution, or merge multiple observation streams onto a shared grid.
use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::series::{time_grid, TimeSeries};
use crate::stats::median;

/// The sampling resolutions compared in the analysis, each carrying the
/// constants the detection stage uses at that resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Hourly IFCB imaging.
    Hourly,
    /// Daily aggregates of the IFCB record.
    Daily,
    /// Satellite chlorophyll product, nominally daily with cloud outages.
    Satellite,
    /// Weekly NBPTS microscopy counts.
    Weekly,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::Hourly,
        Resolution::Daily,
        Resolution::Satellite,
        Resolution::Weekly,
    ];

    /// Spacing of the regular grid at this resolution.
    pub fn bin_width(&self) -> Duration {
        match self {
            Resolution::Hourly => Duration::hours(1),
            Resolution::Daily | Resolution::Satellite => Duration::hours(24),
            Resolution::Weekly => Duration::days(7),
        }
    }

    /// Longest data outage that gap filling is allowed to bridge.
    ///
    /// 12 h at hourly resolution, 73 h for the daily records (so a missed
    /// day flanked by partial days still bridges), 9 d for the weekly
    /// survey (one skipped sampling trip).
    pub fn max_fill_gap(&self) -> Duration {
        match self {
            Resolution::Hourly => Duration::hours(12),
            Resolution::Daily | Resolution::Satellite => Duration::hours(73),
            Resolution::Weekly => Duration::days(9),
        }
    }

    /// Shortest above-threshold run reported as a bloom.
    pub fn min_bloom_length(&self) -> Duration {
        match self {
            Resolution::Hourly | Resolution::Daily | Resolution::Satellite => Duration::hours(48),
            Resolution::Weekly => Duration::days(14),
        }
    }

    /// Default centered smoothing window (odd, in samples).
    pub fn smoothing_window(&self) -> usize {
        match self {
            Resolution::Hourly => 25,
            Resolution::Daily | Resolution::Satellite => 3,
            Resolution::Weekly => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Hourly => "hourly",
            Resolution::Daily => "daily",
            Resolution::Satellite => "satellite",
            Resolution::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the observations falling into one grid bin are reduced to one value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinStatistic {
    #[default]
    Mean,
    Median,
    Max,
}

/// Aggregates one or more irregular observation series onto a shared regular
/// time grid.
///
/// Observations are assigned to the bin whose start they fall at or after;
/// bins that receive no finite observation come out as NaN so downstream
/// gap accounting still sees them.
#[derive(Debug, Clone)]
pub struct Rebinner {
    /// The evenly spaced timestamp axis onto which observations are binned.
    pub grid: Vec<NaiveDateTime>,
    pub bin_width: Duration,
    pub statistic: BinStatistic,
    bins: Vec<Vec<f64>>,
}

impl Rebinner {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        bin_width: Duration,
        statistic: BinStatistic,
    ) -> Self {
        let grid = time_grid(start, end, bin_width);
        let bins = vec![Vec::new(); grid.len()];
        Self {
            grid,
            bin_width,
            statistic,
            bins,
        }
    }

    /// A rebinner spanning `start..=end` on `resolution`'s grid.
    pub fn for_resolution(
        start: NaiveDateTime,
        end: NaiveDateTime,
        resolution: Resolution,
        statistic: BinStatistic,
    ) -> Self {
        Self::new(start, end, resolution.bin_width(), statistic)
    }

    fn bin_index(&self, t: NaiveDateTime) -> Option<usize> {
        let start = *self.grid.first()?;
        if t < start {
            return None;
        }
        let idx = ((t - start).num_seconds() / self.bin_width.num_seconds()) as usize;
        (idx < self.grid.len()).then_some(idx)
    }

    /// Put every finite observation of `series` into its grid bin.
    /// Observations outside the grid span are ignored.
    pub fn push(&mut self, series: &TimeSeries) {
        for (t, v) in series.iter() {
            if !v.is_finite() {
                continue;
            }
            if let Some(idx) = self.bin_index(*t) {
                self.bins[idx].push(*v);
            }
        }
    }

    /// The number of observations that landed in each bin.
    pub fn occupancy(&self) -> Vec<usize> {
        self.bins.iter().map(|b| b.len()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(|b| b.is_empty())
    }

    /// Reduce each bin with the configured statistic, producing the regular
    /// series for this resolution.
    pub fn aggregate(&self) -> TimeSeries {
        let values = self
            .bins
            .iter()
            .map(|bin| {
                if bin.is_empty() {
                    return f64::NAN;
                }
                match self.statistic {
                    BinStatistic::Mean => bin.iter().sum::<f64>() / bin.len() as f64,
                    BinStatistic::Median => median(bin).unwrap_or(f64::NAN),
                    BinStatistic::Max => bin.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect();
        TimeSeries::wrap(self.grid.clone(), values)
    }
}
