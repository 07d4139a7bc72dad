//! emdat-trends - EM-DAT Disaster Data Analysis & Chart Generator
//!
//! One-shot batch pipeline: load, clean, aggregate, analyze, chart, export.

use anyhow::Context;
use clap::Parser;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::path::PathBuf;

use emdat_trends::charts::ChartError;
use emdat_trends::stats::TrendLine;
use emdat_trends::{
    Aggregator, ChartPlotter, DataLoader, DataTransformer, Dimension, OutputWriter,
    PipelineConfig, TrendCalculator,
};

fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::parse();
    emdat_trends::logger::init_logger(config.verbose);

    tracing::info!("Starting emdat-trends pipeline");
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {e}");
        eprintln!("{e}");
        std::process::exit(1);
    }

    run(&config)
}

fn run(config: &PipelineConfig) -> anyhow::Result<()> {
    let loader = DataLoader::new(&config.data_dir);
    let raw = loader
        .load_csv(&config.emdat_file)
        .context("loading EM-DAT export")?;
    tracing::info!(rows = raw.height(), cols = raw.width(), "Loaded EM-DAT export");

    let population = loader
        .load_optional_csv(config.population_file.as_deref())
        .context("loading population table")?;
    let temperature = loader
        .load_optional_csv(config.temperature_file.as_deref())
        .context("loading temperature anomaly table")?;

    let transformed = DataTransformer::transform(&raw, population.as_ref())
        .context("cleaning EM-DAT export")?;
    transformed.report.log_summary();
    if transformed.report.kept_rows == 0 {
        tracing::warn!("No rows survived cleaning; trend and chart stages will be empty");
    }

    OutputWriter::write_transformed(&transformed.df, &config.output)
        .context("writing transformed dataset")?;
    OutputWriter::write_report(&transformed.report, &config.report_path())
        .context("writing cleaning report")?;
    tracing::info!(path = %config.output.display(), "Wrote transformed dataset");

    for dimension in [Dimension::Year, Dimension::YearCountry, Dimension::YearType] {
        let summary = Aggregator::summarize(&transformed.df, dimension)?;
        tracing::info!(
            dimension = dimension.label(),
            groups = summary.height(),
            "Computed aggregate"
        );
    }

    let counts = TrendCalculator::yearly_counts(&transformed.df, true)?;
    let deaths = TrendCalculator::yearly_deaths(&transformed.df, true)?;
    let changes = TrendCalculator::pct_change_from_baseline(&counts);

    let death_points: Vec<(f64, f64)> = deaths.iter().map(|(y, d)| (*y as f64, *d)).collect();
    let deaths_trend = TrendCalculator::linear_trend(&death_points);
    if let Some(trend) = &deaths_trend {
        tracing::info!(
            slope = trend.slope,
            r_squared = trend.r_squared,
            "Yearly deaths trend"
        );
    }

    for (disaster_type, trend) in TrendCalculator::type_trends(&transformed.df)? {
        if let Some(trend) = trend {
            tracing::debug!(
                disaster_type = %disaster_type,
                slope = trend.slope,
                "Per-type count trend"
            );
        }
    }

    let warming_points = match &temperature {
        Some(temperature) => {
            let anomalies = TrendCalculator::anomaly_series(temperature)?;
            let points: Vec<(f64, f64)> = anomalies
                .iter()
                .filter_map(|(year, anomaly)| deaths.get(year).map(|d| (*anomaly, *d)))
                .collect();

            let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
            let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
            let correlation = TrendCalculator::correlation(&xs, &ys);
            tracing::info!(
                r = correlation.r,
                p_value = correlation.p_value,
                significant = correlation.is_significant,
                "Temperature anomaly vs yearly deaths"
            );
            points
        }
        None => Vec::new(),
    };

    if !config.no_charts {
        render_charts(
            config,
            &transformed.df,
            &counts,
            &deaths,
            &changes,
            deaths_trend.as_ref(),
            &warming_points,
        )?;
    }

    tracing::info!("Pipeline finished");
    Ok(())
}

/// Render every chart; a failed chart is logged and skipped, the data
/// outputs are already on disk.
#[allow(clippy::too_many_arguments)]
fn render_charts(
    config: &PipelineConfig,
    df: &DataFrame,
    counts: &[(i64, u32)],
    deaths: &BTreeMap<i64, f64>,
    changes: &[(i64, f64)],
    deaths_trend: Option<&TrendLine>,
    warming_points: &[(f64, f64)],
) -> anyhow::Result<()> {
    let plotter = ChartPlotter::new(&config.charts_dir).context("creating charts directory")?;

    let report = |name: &str, result: Result<PathBuf, ChartError>| match result {
        Ok(path) => tracing::info!(chart = name, path = %path.display(), "Rendered chart"),
        Err(e) => tracing::warn!(chart = name, error = %e, "Chart rendering failed"),
    };

    report(
        "deaths_per_year",
        plotter.deaths_time_series(deaths, deaths_trend),
    );
    report("disasters_per_year", plotter.counts_time_series(counts));
    report("pct_change_vs_baseline", plotter.pct_change_series(changes));

    let type_totals = death_totals_by(df, Dimension::YearType)?;
    report("deaths_by_type", plotter.totals_by_type(&type_totals));

    let country_totals = death_totals_by(df, Dimension::YearCountry)?;
    report(
        "top_countries",
        plotter.top_countries(&country_totals, config.top_countries),
    );

    if !warming_points.is_empty() {
        let trend = TrendCalculator::linear_trend(warming_points);
        report(
            "warming_correlation",
            plotter.warming_scatter(warming_points, trend.as_ref()),
        );
    }

    Ok(())
}

/// Fold an aggregate down to total deaths per secondary key.
fn death_totals_by(df: &DataFrame, dimension: Dimension) -> anyhow::Result<Vec<(String, f64)>> {
    let summary = Aggregator::summarize(df, dimension)?;
    let rows = Aggregator::rows(&summary, dimension)?;

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        let key = match dimension {
            Dimension::YearCountry => row.country,
            Dimension::YearType => row.disaster_type,
            Dimension::Year => None,
        };
        if let Some(key) = key {
            *totals.entry(key).or_default() += row.total_deaths;
        }
    }
    Ok(totals.into_iter().collect())
}
