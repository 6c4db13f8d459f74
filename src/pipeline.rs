//! The batch pipeline: query → clean → resample → detect → measure → plot,
//! once per taxon and sampling resolution, then the cross-resolution
//! accuracy comparison against the hourly reference.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::bloom::DetectedBloom;
use crate::config::{AnalysisConfig, DetectorSettings};
use crate::corrections::{apply_corrections, PeakCorrection};
use crate::csv_io::{self, MatchSummaryRow};
use crate::resample::{Rebinner, Resolution};
use crate::series::TimeSeries;
use crate::smooth::rolling_mean_centered;
use crate::stats::match_blooms;

/// Run-wide switches that come from the command line rather than the config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub render_figures: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            render_figures: true,
        }
    }
}

/// One resolution's detection products for one taxon.
#[derive(Debug, Clone)]
pub struct ResolutionPass {
    pub resolution: Resolution,
    /// The rebinned, smoothed series detection ran on.
    pub series: TimeSeries,
    /// The resolved biomass threshold.
    pub threshold: f64,
    pub blooms: Vec<DetectedBloom>,
}

/// Rebin `observations` onto `resolution`'s grid, smooth, and detect blooms.
pub fn run_resolution_pass(
    observations: &TimeSeries,
    resolution: Resolution,
    settings: &DetectorSettings,
) -> Result<ResolutionPass> {
    let start = *observations
        .times
        .first()
        .context("empty observation series")?;
    let end = *observations.times.last().unwrap();

    let mut rebinner = Rebinner::for_resolution(start, end, resolution, settings.statistic());
    rebinner.push(observations);
    let binned = rebinner.aggregate();

    let window = settings.smoothing_window(resolution);
    let smoothed_values = if window > 1 && window <= binned.len() {
        rolling_mean_centered(&binned.values, window)
            .with_context(|| format!("smoothing the {resolution} series"))?
    } else {
        if window > binned.len() {
            warn!(
                "{resolution} series ({} bins) shorter than smoothing window {window}, skipping",
                binned.len()
            );
        }
        binned.values.clone()
    };
    let series = TimeSeries::wrap(binned.times.clone(), smoothed_values);

    let detector = settings.detector(resolution);
    let blooms = detector
        .detect_blooms(&series)
        .with_context(|| format!("detecting blooms at {resolution} resolution"))?;
    let threshold = detector
        .threshold
        .resolve(&series.values)
        .context("resolving the bloom threshold")?;

    info!(
        "{resolution}: {} blooms over {} bins (threshold {threshold:0.4})",
        blooms.len(),
        series.len()
    );
    Ok(ResolutionPass {
        resolution,
        series,
        threshold,
        blooms,
    })
}

fn sanitize(taxon: &str) -> String {
    taxon
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn write_pass_outputs(
    out_dir: &Path,
    taxon: &str,
    pass: &ResolutionPass,
    options: &RunOptions,
) -> Result<()> {
    let stem = format!("{}_{}", sanitize(taxon), pass.resolution.label());
    csv_io::write_bloom_summary(
        out_dir.join(format!("blooms_{stem}.csv")),
        taxon,
        pass.resolution,
        &pass.blooms,
    )?;

    #[cfg(feature = "plot")]
    if options.render_figures {
        let figure = out_dir.join(format!("fig_{stem}.png"));
        crate::plot::draw_png_file(
            &pass.series,
            &pass.blooms,
            pass.threshold,
            &format!("{taxon} ({})", pass.resolution),
            &figure,
        )
        .map_err(|e| anyhow::anyhow!("rendering {}: {e}", figure.display()))?;
    }
    #[cfg(not(feature = "plot"))]
    let _ = options;
    Ok(())
}

struct TaxonInputs<'a> {
    taxon: &'a str,
    hourly: &'a TimeSeries,
    daily: Option<&'a TimeSeries>,
    satellite: Option<&'a TimeSeries>,
    weekly: Option<&'a TimeSeries>,
}

fn process_taxon(
    inputs: &TaxonInputs<'_>,
    config: &AnalysisConfig,
    corrections: &[PeakCorrection],
    options: &RunOptions,
    out_dir: &Path,
) -> Result<Vec<MatchSummaryRow>> {
    let taxon = inputs.taxon;

    let mut passes = Vec::new();
    for resolution in Resolution::ALL {
        let observations = match resolution {
            Resolution::Hourly => Some(inputs.hourly),
            // The daily record falls back to rebinning the hourly one
            Resolution::Daily => Some(inputs.daily.unwrap_or(inputs.hourly)),
            Resolution::Satellite => inputs.satellite,
            Resolution::Weekly => inputs.weekly,
        };
        let Some(observations) = observations else {
            info!("{taxon}: no {resolution} input, skipping");
            continue;
        };
        let settings = config.detectors.for_resolution(resolution);
        let mut pass = run_resolution_pass(observations, resolution, settings)
            .with_context(|| format!("{taxon} at {resolution} resolution"))?;
        let applied = apply_corrections(taxon, resolution, &mut pass.blooms, corrections);
        if applied > 0 {
            info!("{taxon}: applied {applied} manual peak corrections at {resolution}");
        }
        write_pass_outputs(out_dir, taxon, &pass, options)?;
        passes.push(pass);
    }

    let reference = passes
        .iter()
        .find(|p| p.resolution == Resolution::Hourly)
        .context("the hourly reference pass is required")?
        .clone();

    let rows = passes
        .iter()
        .filter(|p| p.resolution != Resolution::Hourly)
        .map(|p| {
            let report = match_blooms(&reference.blooms, &p.blooms, config.match_tolerance());
            MatchSummaryRow::new(taxon, p.resolution, &report)
        })
        .collect();
    Ok(rows)
}

/// Execute the full analysis described by `config`.
///
/// Returns the accuracy summary rows, which are also written to
/// `match_summary.csv` in the output directory.
pub fn run(config: &AnalysisConfig, options: &RunOptions) -> Result<Vec<MatchSummaryRow>> {
    let hourly_path = config
        .inputs
        .hourly
        .as_ref()
        .context("the hourly reference input is required")?;
    let hourly_by_taxon = csv_io::read_observations(hourly_path)?;

    let daily_by_taxon: BTreeMap<String, TimeSeries> = match &config.inputs.daily {
        Some(path) => csv_io::read_observations(path)?,
        None => BTreeMap::new(),
    };
    let weekly_by_taxon: BTreeMap<String, TimeSeries> = match &config.inputs.weekly {
        Some(path) => csv_io::read_observations(path)?,
        None => BTreeMap::new(),
    };

    let satellite = load_satellite(config)?;

    let taxa: Vec<String> = if config.taxa.is_empty() {
        hourly_by_taxon.keys().cloned().collect()
    } else {
        config.taxa.clone()
    };
    if taxa.is_empty() {
        bail!("no taxa found in {}", hourly_path.display());
    }

    let out_dir: &PathBuf = &config.output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let corrections = config.corrections();

    let jobs: Vec<TaxonInputs<'_>> = taxa
        .iter()
        .filter_map(|taxon| {
            let Some(hourly) = hourly_by_taxon.get(taxon) else {
                warn!("{taxon}: absent from the hourly input, skipping");
                return None;
            };
            Some(TaxonInputs {
                taxon: taxon.as_str(),
                hourly,
                daily: daily_by_taxon.get(taxon),
                satellite: satellite.as_ref(),
                weekly: weekly_by_taxon.get(taxon),
            })
        })
        .collect();

    #[cfg(feature = "parallelism")]
    let results: Vec<Result<Vec<MatchSummaryRow>>> = jobs
        .par_iter()
        .map(|inputs| process_taxon(inputs, config, &corrections, options, out_dir))
        .collect();
    #[cfg(not(feature = "parallelism"))]
    let results: Vec<Result<Vec<MatchSummaryRow>>> = jobs
        .iter()
        .map(|inputs| process_taxon(inputs, config, &corrections, options, out_dir))
        .collect();

    let mut rows = Vec::new();
    for result in results {
        rows.extend(result?);
    }

    csv_io::write_match_summary(out_dir.join("match_summary.csv"), &rows)?;
    info!(
        "wrote {} accuracy rows to {}",
        rows.len(),
        out_dir.join("match_summary.csv").display()
    );
    Ok(rows)
}

#[cfg(feature = "netcdf")]
fn load_satellite(config: &AnalysisConfig) -> Result<Option<TimeSeries>> {
    match &config.inputs.satellite {
        Some(path) => Ok(Some(crate::netcdf_io::read_chlorophyll(
            path,
            &config.inputs.satellite_variable,
        )?)),
        None => Ok(None),
    }
}

#[cfg(not(feature = "netcdf"))]
fn load_satellite(config: &AnalysisConfig) -> Result<Option<TimeSeries>> {
    if config.inputs.satellite.is_some() {
        warn!("satellite input configured but this build lacks the 'netcdf' feature, skipping");
    }
    Ok(None)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::{hourly_series, two_bloom_profile};

    #[test]
    fn test_resolution_pass_hourly_and_daily_agree_on_bloom_count() {
        let observations = hourly_series(&two_bloom_profile());
        let settings = DetectorSettings {
            absolute_threshold: Some(5.0),
            smoothing_window: Some(1),
            ..DetectorSettings::default()
        };

        let hourly = run_resolution_pass(&observations, Resolution::Hourly, &settings).unwrap();
        assert_eq!(hourly.blooms.len(), 2);
        assert!((hourly.threshold - 5.0).abs() < 1e-9);

        // Rebinned daily, the two plateaus persist but the 2-hour spike
        // dilutes below threshold
        let daily = run_resolution_pass(&observations, Resolution::Daily, &settings).unwrap();
        assert_eq!(daily.blooms.len(), 2);
        let report = match_blooms(&hourly.blooms, &daily.blooms, chrono::Duration::days(2));
        assert_eq!(report.true_positives(), 2);
    }

    #[test]
    fn test_run_end_to_end_from_csv() {
        use std::io::Write;

        use crate::test_data::base_time;
        use chrono::Duration;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hourly.csv");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(file, "timestamp,taxon,biovolume").unwrap();
        for (i, value) in two_bloom_profile().iter().enumerate() {
            let t = base_time() + Duration::hours(i as i64);
            writeln!(
                file,
                "{},Skeletonema spp.,{value}",
                t.format("%Y-%m-%d %H:%M:%S")
            )
            .unwrap();
        }

        let mut config: AnalysisConfig = toml::from_str("[inputs]").unwrap();
        config.inputs.hourly = Some(input);
        config.output_dir = dir.path().join("out");
        config.detectors.hourly.absolute_threshold = Some(5.0);
        config.detectors.hourly.smoothing_window = Some(1);
        config.detectors.daily.absolute_threshold = Some(5.0);
        config.detectors.daily.smoothing_window = Some(1);

        let options = RunOptions {
            render_figures: false,
        };
        let rows = run(&config, &options).unwrap();

        // Only the daily comparison runs: no satellite or weekly inputs
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].resolution, "daily");
        assert_eq!(rows[0].true_positives, 2);
        assert!(config.output_dir.join("match_summary.csv").exists());
        assert!(config
            .output_dir
            .join("blooms_skeletonema_spp__hourly.csv")
            .exists());
    }

    #[test]
    fn test_resolution_pass_skips_oversized_window() {
        let observations = hourly_series(&two_bloom_profile());
        let settings = DetectorSettings {
            absolute_threshold: Some(5.0),
            smoothing_window: Some(9999),
            ..DetectorSettings::default()
        };
        // Falls back to the unsmoothed series rather than erroring
        let pass = run_resolution_pass(&observations, Resolution::Hourly, &settings).unwrap();
        assert_eq!(pass.blooms.len(), 2);
    }
}
