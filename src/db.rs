//! Pull classified-image biovolume totals out of the image-classification
//! database instead of a pre-exported CSV.
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use mysql::prelude::Queryable;
use mysql::{params, Pool};

use crate::series::TimeSeries;

const BIOVOLUME_QUERY: &str = r"
    SELECT DATE_FORMAT(s.sample_time, '%Y-%m-%d %H:%i:%s') AS sample_time,
           SUM(r.biovolume) AS biovolume
    FROM samples s
    JOIN rois r ON r.sample_id = s.sample_id
    WHERE r.class_label = :taxon
      AND s.sample_time >= :start
      AND s.sample_time < :end
    GROUP BY s.sample_time
    ORDER BY s.sample_time";

/// A connection pool against the classifier's MySQL database.
pub struct ClassifierDb {
    pool: Pool,
}

impl ClassifierDb {
    pub fn connect(url: &str) -> Result<Self> {
        let pool = Pool::new(url).context("connecting to the classifier database")?;
        Ok(Self { pool })
    }

    /// Sum classified ROI biovolume per sample for `taxon` over
    /// `[start, end)`, as an irregular observation series.
    pub fn fetch_biovolume(
        &self,
        taxon: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        let mut conn = self.pool.get_conn()?;
        let rows: Vec<(String, f64)> = conn
            .exec(
                BIOVOLUME_QUERY,
                params! {
                    "taxon" => taxon,
                    "start" => start.format("%Y-%m-%d").to_string(),
                    "end" => end.format("%Y-%m-%d").to_string(),
                },
            )
            .with_context(|| format!("querying biovolume for {taxon}"))?;
        info!("fetched {} samples for {} from the classifier db", rows.len(), taxon);
        series_from_rows(rows)
    }
}

fn series_from_rows(rows: Vec<(String, f64)>) -> Result<TimeSeries> {
    let mut times = Vec::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len());
    for (raw, biovolume) in rows {
        let t = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("bad sample_time {raw:?}"))?;
        times.push(t);
        values.push(biovolume);
    }
    TimeSeries::new(times, values).context("assembling the database series")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_series_from_rows() {
        let rows = vec![
            ("2018-06-01 11:00:00".to_string(), 2.5),
            ("2018-06-01 12:00:00".to_string(), 3.5),
        ];
        let series = series_from_rows(rows).unwrap();
        assert_eq!(series.len(), 2);
        assert!((series.values[1] - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_series_from_rows_rejects_bad_timestamp() {
        let rows = vec![("yesterday".to_string(), 2.5)];
        assert!(series_from_rows(rows).is_err());
    }
}
