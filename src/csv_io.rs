//! CSV input and the summary tables the analysis publishes.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::bloom::DetectedBloom;
use crate::resample::Resolution;
use crate::series::TimeSeries;
use crate::stats::BloomMatchReport;

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    timestamp: String,
    taxon: String,
    biovolume: Option<f64>,
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Read an observation table (`timestamp,taxon,biovolume`) into one series
/// per taxon, sorted by time. Rows with an unparseable timestamp are
/// reported and skipped; an empty biovolume field becomes a missing value.
pub fn read_observations<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, TimeSeries>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening observation file {}", path.display()))?;

    let mut per_taxon: BTreeMap<String, Vec<(NaiveDateTime, f64)>> = BTreeMap::new();
    for (row, result) in reader.deserialize::<ObservationRecord>().enumerate() {
        let record = result.with_context(|| format!("row {} of {}", row + 1, path.display()))?;
        let Some(t) = parse_timestamp(&record.timestamp) else {
            warn!(
                "skipping row {} of {}: bad timestamp {:?}",
                row + 1,
                path.display(),
                record.timestamp
            );
            continue;
        };
        per_taxon
            .entry(record.taxon)
            .or_default()
            .push((t, record.biovolume.unwrap_or(f64::NAN)));
    }

    let mut out = BTreeMap::new();
    for (taxon, mut pairs) in per_taxon {
        pairs.sort_by_key(|(t, _)| *t);
        let (times, values) = pairs.into_iter().unzip();
        let series = TimeSeries::new(times, values)
            .with_context(|| format!("assembling series for {taxon}"))?;
        out.insert(taxon, series);
    }
    Ok(out)
}

/// One row of the per-taxon bloom summary table.
#[derive(Debug, Serialize)]
pub struct BloomSummaryRow {
    pub taxon: String,
    pub resolution: String,
    pub id: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub peak_time: NaiveDateTime,
    pub peak_value: f64,
    pub mean_value: f64,
    pub integrated: f64,
    pub duration_hours: i64,
    pub n_samples: usize,
    pub n_filled: usize,
}

impl BloomSummaryRow {
    pub fn new(taxon: &str, resolution: Resolution, bloom: &DetectedBloom) -> Self {
        Self {
            taxon: taxon.to_string(),
            resolution: resolution.label().to_string(),
            id: bloom.id,
            start: bloom.start,
            end: bloom.end,
            peak_time: bloom.peak_time,
            peak_value: bloom.peak_value,
            mean_value: bloom.mean_value,
            integrated: bloom.integrated,
            duration_hours: bloom.duration().num_hours(),
            n_samples: bloom.n_samples,
            n_filled: bloom.n_filled,
        }
    }
}

/// One row of the cross-resolution accuracy summary table.
#[derive(Debug, Serialize)]
pub struct MatchSummaryRow {
    pub taxon: String,
    pub resolution: String,
    pub n_reference: usize,
    pub n_candidate: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub misses: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mean_abs_peak_offset_hours: Option<f64>,
    pub mean_magnitude_ratio: Option<f64>,
}

impl MatchSummaryRow {
    pub fn new(taxon: &str, resolution: Resolution, report: &BloomMatchReport) -> Self {
        Self {
            taxon: taxon.to_string(),
            resolution: resolution.label().to_string(),
            n_reference: report.n_reference,
            n_candidate: report.n_candidate,
            true_positives: report.true_positives(),
            false_positives: report.false_positives(),
            misses: report.misses(),
            precision: report.precision(),
            recall: report.recall(),
            f1: report.f1(),
            mean_abs_peak_offset_hours: report.mean_abs_peak_offset_hours(),
            mean_magnitude_ratio: report.mean_magnitude_ratio(),
        }
    }
}

/// Write the bloom summary rows for one taxon-resolution detection pass.
pub fn write_bloom_summary<P: AsRef<Path>>(
    path: P,
    taxon: &str,
    resolution: Resolution,
    blooms: &[DetectedBloom],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating bloom summary {}", path.display()))?;
    for bloom in blooms {
        writer.serialize(BloomSummaryRow::new(taxon, resolution, bloom))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the accuracy summary table.
pub fn write_match_summary<P: AsRef<Path>>(path: P, rows: &[MatchSummaryRow]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating match summary {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_observations_groups_and_sorts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,taxon,biovolume").unwrap();
        writeln!(file, "2018-06-01 13:00:00,Skeletonema spp.,4.5").unwrap();
        writeln!(file, "2018-06-01 11:00:00,Skeletonema spp.,2.5").unwrap();
        writeln!(file, "2018-06-01 12:00:00,Thalassiosira spp.,1.0").unwrap();
        writeln!(file, "2018-06-01 14:00:00,Skeletonema spp.,").unwrap();
        writeln!(file, "not-a-time,Skeletonema spp.,9.9").unwrap();

        let by_taxon = read_observations(file.path()).unwrap();
        assert_eq!(by_taxon.len(), 2);

        let skel = &by_taxon["Skeletonema spp."];
        assert_eq!(skel.len(), 3);
        assert!((skel.values[0] - 2.5).abs() < 1e-9);
        assert!((skel.values[1] - 4.5).abs() < 1e-9);
        assert!(skel.values[2].is_nan());
        assert!(crate::series::is_increasing(&skel.times));
    }

    #[test]
    fn test_write_bloom_summary_round_trip_header() {
        let series_blooms = vec![DetectedBloom {
            id: 1,
            start: parse_timestamp("2018-06-01 00:00:00").unwrap(),
            end: parse_timestamp("2018-06-04 00:00:00").unwrap(),
            peak_time: parse_timestamp("2018-06-02 06:00:00").unwrap(),
            peak_value: 12.0,
            mean_value: 8.0,
            integrated: 576.0,
            n_samples: 73,
            n_filled: 1,
        }];
        let file = tempfile::NamedTempFile::new().unwrap();
        write_bloom_summary(file.path(), "Skeletonema spp.", Resolution::Hourly, &series_blooms)
            .unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("taxon,resolution,id,start,end,peak_time"));
        assert_eq!(lines.count(), 1);
    }
}
