//! Satellite chlorophyll product input.
//!
//! Reads a station match-up file: a one-dimensional chlorophyll variable on
//! a CF time coordinate. Fill values become missing points so the satellite
//! record's cloud outages stay visible to the gap accounting downstream.
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use log::debug;

use crate::series::TimeSeries;

fn attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Double(v) => Some(v),
        netcdf::AttributeValue::Float(v) => Some(v as f64),
        _ => None,
    }
}

/// Parse a CF time unit string such as `"days since 2018-06-01 00:00:00"`
/// into the step size and reference time.
fn parse_time_units(units: &str) -> Result<(Duration, NaiveDateTime)> {
    let (unit, reference) = units
        .split_once(" since ")
        .with_context(|| format!("time units {units:?} are not of the form '<unit> since <epoch>'"))?;

    let step = match unit.trim() {
        "seconds" | "second" => Duration::seconds(1),
        "minutes" | "minute" => Duration::minutes(1),
        "hours" | "hour" => Duration::hours(1),
        "days" | "day" => Duration::days(1),
        other => bail!("unsupported time unit {other:?}"),
    };

    let reference = reference.trim();
    let epoch = NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        })
        .with_context(|| format!("unparseable reference time {reference:?}"))?;
    Ok((step, epoch))
}

/// Read `variable` and its time coordinate from the product at `path`.
pub fn read_chlorophyll<P: AsRef<Path>>(path: P, variable: &str) -> Result<TimeSeries> {
    let path = path.as_ref();
    let file = netcdf::open(path)
        .with_context(|| format!("opening satellite product {}", path.display()))?;

    let time_var = file
        .variable("time")
        .context("product has no 'time' coordinate")?;
    let units = attr_string(&time_var, "units").context("'time' has no units attribute")?;
    let (step, epoch) = parse_time_units(&units)?;

    let raw_times: Vec<f64> = time_var
        .get_values(..)
        .context("reading the time coordinate")?;
    let times: Vec<NaiveDateTime> = raw_times
        .iter()
        .map(|t| epoch + Duration::seconds((t * step.num_seconds() as f64).round() as i64))
        .collect();

    let chl_var = file
        .variable(variable)
        .with_context(|| format!("product has no {variable:?} variable"))?;
    if chl_var.dimensions().len() != 1 {
        bail!(
            "{variable:?} has {} dimensions, expected a 1-D station match-up series",
            chl_var.dimensions().len()
        );
    }
    let fill = attr_f64(&chl_var, "_FillValue");
    let mut values: Vec<f64> = chl_var
        .get_values(..)
        .with_context(|| format!("reading {variable:?}"))?;
    for v in values.iter_mut() {
        if !v.is_finite() || fill.is_some_and(|f| *v == f) {
            *v = f64::NAN;
        }
    }

    debug!(
        "read {} satellite samples from {} ({} observed)",
        times.len(),
        path.display(),
        values.iter().filter(|v| v.is_finite()).count()
    );
    TimeSeries::new(times, values).context("assembling the satellite series")
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_time_units() {
        let (step, epoch) = parse_time_units("days since 2018-06-01 00:00:00").unwrap();
        assert_eq!(step, Duration::days(1));
        assert_eq!(
            epoch,
            NaiveDate::from_ymd_opt(2018, 6, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );

        let (step, epoch) = parse_time_units("hours since 1970-01-01").unwrap();
        assert_eq!(step, Duration::hours(1));
        assert_eq!(epoch.date(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());

        assert!(parse_time_units("fortnights since 1970-01-01").is_err());
        assert!(parse_time_units("days after 1970-01-01").is_err());
    }

    #[test]
    fn test_round_trip_with_fill_values() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("matchup.nc");
        {
            let mut file = netcdf::create(&path)?;
            file.add_dimension("time", 4)?;

            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_values(&[0.0, 1.0, 2.0, 3.0], ..)?;
            time.put_attribute("units", "days since 2018-06-01 00:00:00")?;

            let mut chl = file.add_variable::<f64>("chlor_a", &["time"])?;
            chl.put_values(&[1.5, -9999.0, 3.0, 4.5], ..)?;
            chl.put_attribute("_FillValue", -9999.0)?;
        }

        let series = read_chlorophyll(&path, "chlor_a")?;
        assert_eq!(series.len(), 4);
        assert!(series.values[1].is_nan());
        assert_eq!(series.count_finite(), 3);
        assert_eq!(
            series.times[2],
            NaiveDate::from_ymd_opt(2018, 6, 3)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        Ok(())
    }
}
