//! Chart Plotter Module
//! Renders static PNG charts from aggregated tables using plotters.

use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stats::TrendLine;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Chart rendering failed: {0}")]
    Render(String),
    #[error("No data to plot")]
    Empty,
}

fn render_err(e: impl std::fmt::Display) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Color palette for series
pub const SERIES_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
pub const TREND_COLOR: RGBColor = RGBColor(231, 76, 60); // Red
pub const BAR_COLOR: RGBColor = RGBColor(46, 204, 113); // Green
pub const SCATTER_COLOR: RGBColor = RGBColor(155, 89, 182); // Purple

const CHART_SIZE: (u32, u32) = (1024, 640);

/// Renders chart images into a fixed output directory.
pub struct ChartPlotter {
    out_dir: PathBuf,
}

impl ChartPlotter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self, ChartError> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Deaths-per-year time series with an optional fitted trend line.
    pub fn deaths_time_series(
        &self,
        deaths: &BTreeMap<i64, f64>,
        trend: Option<&TrendLine>,
    ) -> Result<PathBuf, ChartError> {
        if deaths.is_empty() {
            return Err(ChartError::Empty);
        }
        let path = self.out_dir.join("deaths_per_year.png");

        let points: Vec<(i32, f64)> = deaths.iter().map(|(y, d)| (*y as i32, *d)).collect();
        let (x_range, y_max) = series_ranges(&points);

        // The backend borrows the path until the drawing area is dropped.
        {
            let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Disaster Deaths per Year", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(45)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range.clone(), 0f64..y_max)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc("Deaths")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(points.iter().copied(), &SERIES_COLOR))
                .map_err(render_err)?
                .label("Deaths")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], SERIES_COLOR));

            if let Some(trend) = trend {
                let fit: Vec<(i32, f64)> = [x_range.start, x_range.end]
                    .iter()
                    .map(|x| (*x, trend.value_at(*x as f64).max(0.0)))
                    .collect();
                chart
                    .draw_series(LineSeries::new(fit, &TREND_COLOR))
                    .map_err(render_err)?
                    .label(format!("Trend (r² = {:.2})", trend.r_squared))
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], TREND_COLOR));
            }

            chart
                .configure_series_labels()
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }
        Ok(path)
    }

    /// Disaster-count-per-year time series.
    pub fn counts_time_series(&self, counts: &[(i64, u32)]) -> Result<PathBuf, ChartError> {
        if counts.is_empty() {
            return Err(ChartError::Empty);
        }
        let path = self.out_dir.join("disasters_per_year.png");

        let points: Vec<(i32, f64)> = counts
            .iter()
            .map(|(y, c)| (*y as i32, *c as f64))
            .collect();
        let (x_range, y_max) = series_ranges(&points);

        {
            let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Disasters per Year", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_range, 0f64..y_max)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc("Disasters")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(points, &SERIES_COLOR))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }
        Ok(path)
    }

    /// Percent change of yearly counts relative to the baseline decade.
    pub fn pct_change_series(&self, changes: &[(i64, f64)]) -> Result<PathBuf, ChartError> {
        if changes.is_empty() {
            return Err(ChartError::Empty);
        }
        let path = self.out_dir.join("pct_change_vs_baseline.png");

        let points: Vec<(i32, f64)> = changes.iter().map(|(y, p)| (*y as i32, *p)).collect();
        let min_x = points.iter().map(|(x, _)| *x).min().unwrap_or(0) - 1;
        let max_x = points.iter().map(|(x, _)| *x).max().unwrap_or(0) + 1;
        let min_y = points.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
        let max_y = points
            .iter()
            .map(|(_, y)| *y)
            .fold(f64::NEG_INFINITY, f64::max);
        let pad = ((max_y - min_y) * 0.1).max(1.0);

        {
            let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Disaster Count Change vs Baseline Decade", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(min_x..max_x, (min_y - pad)..(max_y + pad))
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc("Change (%)")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(points, &TREND_COLOR))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }
        Ok(path)
    }

    /// Horizontal bar chart of total deaths per disaster type.
    pub fn totals_by_type(&self, totals: &[(String, f64)]) -> Result<PathBuf, ChartError> {
        let path = self.out_dir.join("deaths_by_type.png");
        self.horizontal_bars(&path, "Total Deaths by Disaster Type", totals)?;
        Ok(path)
    }

    /// Ranked country breakdown, the static stand-in for a choropleth.
    pub fn top_countries(
        &self,
        totals: &[(String, f64)],
        top_n: usize,
    ) -> Result<PathBuf, ChartError> {
        let mut ranked = totals.to_vec();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_n);

        let path = self.out_dir.join("top_countries.png");
        self.horizontal_bars(&path, "Countries by Total Deaths", &ranked)?;
        Ok(path)
    }

    /// Temperature anomaly vs yearly deaths scatter with regression line.
    pub fn warming_scatter(
        &self,
        points: &[(f64, f64)],
        trend: Option<&TrendLine>,
    ) -> Result<PathBuf, ChartError> {
        if points.is_empty() {
            return Err(ChartError::Empty);
        }
        let path = self.out_dir.join("warming_correlation.png");

        let min_x = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
        let max_x = points
            .iter()
            .map(|(x, _)| *x)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_y = points
            .iter()
            .map(|(_, y)| *y)
            .fold(f64::NEG_INFINITY, f64::max);
        let x_pad = ((max_x - min_x) * 0.1).max(0.05);

        {
            let root = BitMapBackend::new(&path, CHART_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Temperature Anomaly vs Yearly Deaths", ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(45)
                .y_label_area_size(80)
                .build_cartesian_2d(
                    (min_x - x_pad)..(max_x + x_pad),
                    0f64..(max_y * 1.1).max(1.0),
                )
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Temperature Anomaly (°C)")
                .y_desc("Deaths")
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(
                    points
                        .iter()
                        .map(|(x, y)| Circle::new((*x, *y), 4, SCATTER_COLOR.filled())),
                )
                .map_err(render_err)?;

            if let Some(trend) = trend {
                let fit = vec![
                    (min_x, trend.value_at(min_x).max(0.0)),
                    (max_x, trend.value_at(max_x).max(0.0)),
                ];
                chart
                    .draw_series(LineSeries::new(fit, &TREND_COLOR))
                    .map_err(render_err)?;
            }

            root.present().map_err(render_err)?;
        }
        Ok(path)
    }

    fn horizontal_bars(
        &self,
        path: &Path,
        caption: &str,
        rows: &[(String, f64)],
    ) -> Result<(), ChartError> {
        if rows.is_empty() {
            return Err(ChartError::Empty);
        }

        let max_value = rows
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::NEG_INFINITY, f64::max)
            .max(1.0);
        let labels: Vec<String> = rows.iter().map(|(name, _)| name.clone()).collect();

        let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(45)
            .y_label_area_size(160)
            .build_cartesian_2d(0f64..max_value * 1.1, (0..rows.len()).into_segmented())
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("Total Deaths")
            .y_label_formatter(&|segment| match segment {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    labels.get(*i).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(rows.iter().enumerate().map(|(i, (_, value))| {
                Rectangle::new(
                    [
                        (0.0, SegmentValue::Exact(i)),
                        (*value, SegmentValue::Exact(i + 1)),
                    ],
                    BAR_COLOR.filled(),
                )
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

/// Padded x range and y maximum for a yearly series.
fn series_ranges(points: &[(i32, f64)]) -> (std::ops::Range<i32>, f64) {
    let min_x = points.iter().map(|(x, _)| *x).min().unwrap_or(0);
    let max_x = points.iter().map(|(x, _)| *x).max().unwrap_or(0);
    let max_y = points
        .iter()
        .map(|(_, y)| *y)
        .fold(f64::NEG_INFINITY, f64::max);
    ((min_x - 1)..(max_x + 1), (max_y * 1.1).max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = ChartPlotter::new(dir.path()).unwrap();

        assert!(matches!(
            plotter.deaths_time_series(&BTreeMap::new(), None),
            Err(ChartError::Empty)
        ));
        assert!(matches!(
            plotter.counts_time_series(&[]),
            Err(ChartError::Empty)
        ));
        assert!(matches!(
            plotter.totals_by_type(&[]),
            Err(ChartError::Empty)
        ));
        assert!(matches!(
            plotter.warming_scatter(&[], None),
            Err(ChartError::Empty)
        ));
    }

    #[test]
    fn creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let charts_dir = dir.path().join("charts");
        let plotter = ChartPlotter::new(&charts_dir).unwrap();
        assert!(plotter.out_dir().is_dir());
    }

    #[test]
    fn rendered_charts_land_at_their_target_paths() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = ChartPlotter::new(dir.path()).unwrap();

        let mut deaths = BTreeMap::new();
        deaths.insert(1999i64, 312.0);
        deaths.insert(2000, 25.0);
        let trend = TrendLine {
            slope: -287.0,
            intercept: 573_925.0,
            r_squared: 1.0,
        };

        let results = [
            plotter.deaths_time_series(&deaths, Some(&trend)),
            plotter.counts_time_series(&[(1999, 2), (2000, 1)]),
            plotter.pct_change_series(&[(1999, 0.0), (2000, -50.0)]),
            plotter.warming_scatter(&[(0.36, 312.0), (0.40, 25.0)], Some(&trend)),
        ];

        for result in results {
            match result {
                Ok(path) => {
                    assert_eq!(path.parent().unwrap(), plotter.out_dir());
                    assert!(path.is_file());
                }
                // Headless machines without system fonts cannot draw captions.
                Err(ChartError::Render(_)) => {}
                Err(e) => panic!("unexpected chart error: {e}"),
            }
        }
    }
}
