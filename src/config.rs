//! TOML run configuration for the batch pipeline.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::corrections::PeakCorrection;
use crate::detect::{BloomDetector, ThresholdPolicy};
use crate::resample::{BinStatistic, Resolution};

/// Input locations for each sampling resolution. Any resolution can be left
/// out of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Hourly IFCB observation CSV.
    pub hourly: Option<PathBuf>,
    /// Daily aggregate CSV; when absent the daily record is rebinned from
    /// the hourly one.
    pub daily: Option<PathBuf>,
    /// Satellite chlorophyll NetCDF product.
    pub satellite: Option<PathBuf>,
    /// Variable name inside the satellite product.
    #[serde(default = "default_satellite_variable")]
    pub satellite_variable: String,
    /// Weekly microscopy CSV.
    pub weekly: Option<PathBuf>,
}

fn default_satellite_variable() -> String {
    "chlor_a".to_string()
}

/// Per-resolution overrides of the preset detection constants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Median multiple threshold factor.
    pub threshold_factor: Option<f64>,
    /// Fixed biovolume cutoff; wins over `threshold_factor` when both set.
    pub absolute_threshold: Option<f64>,
    pub max_fill_gap_hours: Option<i64>,
    pub min_bloom_length_hours: Option<i64>,
    pub smoothing_window: Option<usize>,
    pub statistic: Option<BinStatistic>,
}

impl DetectorSettings {
    /// Build a detector for `resolution`, starting from its presets.
    pub fn detector(&self, resolution: Resolution) -> BloomDetector {
        let mut detector = BloomDetector::for_resolution(resolution);
        if let Some(threshold) = self.absolute_threshold {
            detector.threshold = ThresholdPolicy::Absolute(threshold);
        } else if let Some(factor) = self.threshold_factor {
            detector.threshold = ThresholdPolicy::MedianMultiple(factor);
        }
        if let Some(hours) = self.max_fill_gap_hours {
            detector.max_fill_gap = Duration::hours(hours);
        }
        if let Some(hours) = self.min_bloom_length_hours {
            detector.min_bloom_length = Duration::hours(hours);
        }
        detector
    }

    pub fn smoothing_window(&self, resolution: Resolution) -> usize {
        self.smoothing_window
            .unwrap_or_else(|| resolution.smoothing_window())
    }

    pub fn statistic(&self) -> BinStatistic {
        self.statistic.unwrap_or_default()
    }
}

/// Optional per-resolution [`DetectorSettings`] blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorOverrides {
    #[serde(default)]
    pub hourly: DetectorSettings,
    #[serde(default)]
    pub daily: DetectorSettings,
    #[serde(default)]
    pub satellite: DetectorSettings,
    #[serde(default)]
    pub weekly: DetectorSettings,
}

impl DetectorOverrides {
    pub fn for_resolution(&self, resolution: Resolution) -> &DetectorSettings {
        match resolution {
            Resolution::Hourly => &self.hourly,
            Resolution::Daily => &self.daily,
            Resolution::Satellite => &self.satellite,
            Resolution::Weekly => &self.weekly,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Taxa to analyze. Empty means every taxon present in the hourly input.
    #[serde(default)]
    pub taxa: Vec<String>,
    pub inputs: InputConfig,
    #[serde(default)]
    pub detectors: DetectorOverrides,
    /// Peak-matching tolerance between resolutions, in days.
    #[serde(default = "default_match_tolerance_days")]
    pub match_tolerance_days: i64,
    /// Extra manual peak corrections, appended to the built-in table.
    #[serde(default)]
    pub corrections: Vec<PeakCorrection>,
    /// Whether the built-in correction table applies.
    #[serde(default = "default_true")]
    pub use_builtin_corrections: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_match_tolerance_days() -> i64 {
    14
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bloomsignal_out")
}

impl AnalysisConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn match_tolerance(&self) -> Duration {
        Duration::days(self.match_tolerance_days)
    }

    /// The full correction table for this run.
    pub fn corrections(&self) -> Vec<PeakCorrection> {
        let mut table = if self.use_builtin_corrections {
            crate::corrections::builtin_corrections()
        } else {
            Vec::new()
        };
        table.extend(self.corrections.iter().cloned());
        table
    }
}
