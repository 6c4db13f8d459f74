//! Publication figure rendering: the biomass trace with its threshold and
//! the detected bloom intervals shaded behind it.
use std::path;

use plotters::prelude::*;

use crate::bloom::DetectedBloom;
use crate::series::TimeSeries;

const FIGURE_SIZE: (u32, u32) = (960, 540);

pub fn draw_svg_file<P>(
    series: &TimeSeries,
    blooms: &[DetectedBloom],
    threshold: f64,
    title: &str,
    path: P,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: AsRef<path::Path>,
{
    let backend = SVGBackend::new(&path, FIGURE_SIZE);
    draw_on(series, blooms, threshold, title, backend)
}

pub fn draw_png_file<P>(
    series: &TimeSeries,
    blooms: &[DetectedBloom],
    threshold: f64,
    title: &str,
    path: P,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: AsRef<path::Path>,
{
    let backend = BitMapBackend::new(&path, FIGURE_SIZE);
    draw_on(series, blooms, threshold, title, backend)
}

fn draw_on<DB>(
    series: &TimeSeries,
    blooms: &[DetectedBloom],
    threshold: f64,
    title: &str,
    backend: DB,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let root = backend.into_drawing_area();

    let start = *series.times.first().ok_or("empty series")?;
    let days: Vec<f64> = series
        .times
        .iter()
        .map(|t| (*t - start).num_seconds() as f64 / 86_400.0)
        .collect();
    let xmax = days.last().copied().unwrap_or(1.0).max(1.0);
    let ymax = series
        .minmax_finite()
        .map(|(_, max)| max)
        .unwrap_or(1.0)
        .max(threshold)
        * 1.05;

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..xmax, 0.0..ymax)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(format!("Days since {}", start.date()))
        .axis_desc_style(("sans-serif", 16).into_font())
        .y_desc("Biovolume")
        .draw()?;

    // Shade the detected intervals behind everything else
    for bloom in blooms {
        let x0 = (bloom.start - start).num_seconds() as f64 / 86_400.0;
        let x1 = (bloom.end - start).num_seconds() as f64 / 86_400.0;
        chart.draw_series(std::iter::once(Polygon::new(
            vec![(x0, 0.0), (x1, 0.0), (x1, ymax), (x0, ymax)],
            GREEN.mix(0.15).filled(),
        )))?;
    }

    let trace: Vec<(f64, f64)> = days
        .iter()
        .zip(series.values.iter())
        .filter(|(_, v)| v.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    chart.draw_series(LineSeries::new(
        trace,
        ShapeStyle {
            color: BLACK.mix(1.0),
            filled: false,
            stroke_width: 1,
        },
    ))?;

    chart.draw_series(LineSeries::new(
        vec![(0.0, threshold), (xmax, threshold)],
        RED.mix(0.8).stroke_width(1),
    ))?;

    chart.draw_series(blooms.iter().map(|bloom| {
        let x = (bloom.peak_time - start).num_seconds() as f64 / 86_400.0;
        Circle::new((x, bloom.peak_value), 4, RED.filled())
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::detect::{BloomDetector, ThresholdPolicy};
    use crate::resample::Resolution;
    use crate::test_data::{hourly_series, two_bloom_profile};

    #[test]
    fn test_draw_detected_blooms() -> Result<(), Box<dyn std::error::Error>> {
        let series = hourly_series(&two_bloom_profile());
        let detector = BloomDetector {
            threshold: ThresholdPolicy::Absolute(5.0),
            ..BloomDetector::for_resolution(Resolution::Hourly)
        };
        let blooms = detector.detect_blooms(&series).unwrap();

        let dir = tempfile::tempdir()?;
        let png = dir.path().join("blooms.png");
        let svg = dir.path().join("blooms.svg");
        draw_png_file(&series, &blooms, 5.0, "Skeletonema spp. (hourly)", &png)?;
        draw_svg_file(&series, &blooms, 5.0, "Skeletonema spp. (hourly)", &svg)?;
        assert!(png.exists());
        assert!(svg.exists());
        Ok(())
    }
}
