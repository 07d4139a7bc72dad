//! Trend Calculator Module
//! Yearly disaster series, linear trends, and correlation against global
//! warming indicators.

use polars::prelude::*;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::data::schema::canon;

/// Significance threshold for correlation p-values
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Number of initial calendar years averaged into the percent-change
/// baseline (inclusive range, so up to eleven observed years).
pub const BASELINE_SPAN_YEARS: i64 = 10;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Least-squares fit over a yearly series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl TrendLine {
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Pearson correlation with a two-tailed Student's-t p-value.
#[derive(Debug, Clone, Copy)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub is_significant: bool,
}

/// Computes trend and correlation statistics over the transformed frame.
pub struct TrendCalculator;

impl TrendCalculator {
    /// Disaster occurrences per start year, optionally zero-filled across
    /// the full observed year range. A frame with no usable rows yields an
    /// empty series.
    pub fn yearly_counts(
        df: &DataFrame,
        include_zero: bool,
    ) -> Result<Vec<(i64, u32)>, StatsError> {
        let years = i64_column(df, canon::YEAR)?;
        let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
        for year in years.iter().flatten() {
            *counts.entry(*year).or_default() += 1;
        }

        let min_year = counts.keys().next().copied();
        let max_year = counts.keys().last().copied();
        if include_zero {
            if let (Some(min_year), Some(max_year)) = (min_year, max_year) {
                for year in min_year..=max_year {
                    counts.entry(year).or_default();
                }
            }
        }

        Ok(counts.into_iter().collect())
    }

    /// Yearly percent change of disaster counts relative to the mean of the
    /// first baseline decade.
    ///
    /// Returns an empty series when the baseline mean is zero.
    pub fn pct_change_from_baseline(counts: &[(i64, u32)]) -> Vec<(i64, f64)> {
        let Some(&(min_year, _)) = counts.first() else {
            return Vec::new();
        };

        let baseline: Vec<f64> = counts
            .iter()
            .filter(|(year, _)| *year <= min_year + BASELINE_SPAN_YEARS)
            .map(|(_, count)| *count as f64)
            .collect();
        let baseline_mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
        if baseline_mean == 0.0 {
            return Vec::new();
        }

        counts
            .iter()
            .map(|(year, count)| (*year, (*count as f64 / baseline_mean - 1.0) * 100.0))
            .collect()
    }

    /// Yearly death totals, spreading each disaster's deaths uniformly
    /// across its start..=end calendar years. A frame with no usable rows
    /// yields an empty map.
    pub fn yearly_deaths(
        df: &DataFrame,
        include_zero: bool,
    ) -> Result<BTreeMap<i64, f64>, StatsError> {
        let start_years = i64_column(df, canon::YEAR)?;
        let end_years = i64_column(df, canon::END_YEAR)?;
        let deaths = f64_column(df, canon::TOTAL_DEATHS)?;

        let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
        let mut min_start = i64::MAX;
        let mut max_start = i64::MIN;

        for i in 0..df.height() {
            let (Some(start), Some(total)) = (start_years[i], deaths[i]) else {
                continue;
            };
            min_start = min_start.min(start);
            max_start = max_start.max(start);

            let end = end_years[i].filter(|e| *e >= start).unwrap_or(start);
            let span = (end - start + 1) as f64;
            let per_year = total / span;
            for year in start..=end {
                *totals.entry(year).or_default() += per_year;
            }
        }

        if include_zero && min_start <= max_start {
            for year in min_start..=max_start {
                totals.entry(year).or_default();
            }
        }

        Ok(totals)
    }

    /// Least-squares linear fit. Returns None for fewer than two points or
    /// a degenerate x range.
    pub fn linear_trend(points: &[(f64, f64)]) -> Option<TrendLine> {
        let n = points.len() as f64;
        if points.len() < 2 {
            return None;
        }

        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let ss_xx = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum::<f64>();
        let ss_yy = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum::<f64>();
        let ss_xy = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>();

        if ss_xx == 0.0 {
            return None;
        }

        let slope = ss_xy / ss_xx;
        let intercept = mean_y - slope * mean_x;
        let r_squared = if ss_yy == 0.0 {
            1.0
        } else {
            (ss_xy * ss_xy) / (ss_xx * ss_yy)
        };

        Some(TrendLine {
            slope,
            intercept,
            r_squared,
        })
    }

    /// Pearson correlation with a two-tailed p-value from Student's t.
    /// Series of unequal length are truncated to their common prefix.
    pub fn correlation(xs: &[f64], ys: &[f64]) -> Correlation {
        let len = xs.len().min(ys.len());
        if len < 3 {
            return Correlation {
                r: f64::NAN,
                p_value: f64::NAN,
                is_significant: false,
            };
        }
        let (xs, ys) = (&xs[..len], &ys[..len]);
        let n = len as f64;

        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;

        let ss_xx = xs.iter().map(|x| (x - mean_x).powi(2)).sum::<f64>();
        let ss_yy = ys.iter().map(|y| (y - mean_y).powi(2)).sum::<f64>();
        let ss_xy = xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>();

        if ss_xx == 0.0 || ss_yy == 0.0 {
            return Correlation {
                r: f64::NAN,
                p_value: f64::NAN,
                is_significant: false,
            };
        }

        let r = ss_xy / (ss_xx * ss_yy).sqrt();
        if r.abs() >= 1.0 {
            return Correlation {
                r,
                p_value: 0.0,
                is_significant: true,
            };
        }

        let df = n - 2.0;
        let t = r * (df / (1.0 - r * r)).sqrt();

        // Two-tailed p-value using t-distribution
        if let Ok(dist) = StudentsT::new(0.0, 1.0, df) {
            let p_value = 2.0 * (1.0 - dist.cdf(t.abs()));
            Correlation {
                r,
                p_value,
                is_significant: p_value <= SIGNIFICANCE_THRESHOLD,
            }
        } else {
            Correlation {
                r,
                p_value: f64::NAN,
                is_significant: false,
            }
        }
    }

    /// Per-disaster-type count trends, computed in parallel.
    pub fn type_trends(df: &DataFrame) -> Result<Vec<(String, Option<TrendLine>)>, StatsError> {
        let mut types: Vec<String> = str_column(df, canon::DISASTER_TYPE)?
            .into_iter()
            .flatten()
            .collect();
        types.sort();
        types.dedup();

        let trends: Result<Vec<_>, StatsError> = types
            .par_iter()
            .map(|disaster_type| {
                let filtered = df
                    .clone()
                    .lazy()
                    .filter(col(canon::DISASTER_TYPE).eq(lit(disaster_type.as_str())))
                    .collect()?;
                let counts = Self::yearly_counts(&filtered, true)?;
                let points: Vec<(f64, f64)> = counts
                    .iter()
                    .map(|(year, count)| (*year as f64, *count as f64))
                    .collect();
                Ok((disaster_type.clone(), Self::linear_trend(&points)))
            })
            .collect();

        trends
    }

    /// Year-indexed global temperature anomaly from an auxiliary table with
    /// `Year` and `Anomaly` columns.
    pub fn anomaly_series(df: &DataFrame) -> Result<BTreeMap<i64, f64>, StatsError> {
        let years = i64_column(df, "Year")?;
        let anomalies = f64_column(df, "Anomaly")?;

        let mut series = BTreeMap::new();
        for i in 0..df.height() {
            if let (Some(year), Some(anomaly)) = (years[i], anomalies[i]) {
                series.insert(year, anomaly);
            }
        }
        Ok(series)
    }
}

fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, StatsError> {
    let cast = df.column(name)?.cast(&DataType::Int64)?;
    Ok(cast.as_materialized_series().i64()?.into_iter().collect())
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, StatsError> {
    let cast = df.column(name)?.cast(&DataType::Float64)?;
    Ok(cast.as_materialized_series().f64()?.into_iter().collect())
}

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, StatsError> {
    let cast = df.column(name)?.cast(&DataType::String)?;
    Ok(cast
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}
