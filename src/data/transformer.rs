//! Data Transformer Module
//! Cleans raw EM-DAT rows into the canonical transformed schema.
//!
//! Rows missing a required field (start year, country, disaster type) are
//! dropped and counted per reason; missing death counts are imputed to zero.
//! Malformed rows are never fatal.

use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::data::schema::{canon, raw, TransformedRecord};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Required column missing from input: {0}")]
    MissingColumn(String),
}

/// Per-reason counts of dropped and imputed rows for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_missing_year: usize,
    pub dropped_missing_country: usize,
    pub dropped_missing_type: usize,
    pub imputed_deaths: usize,
}

impl CleanReport {
    pub fn dropped_rows(&self) -> usize {
        self.dropped_missing_year + self.dropped_missing_country + self.dropped_missing_type
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total_rows,
            kept = self.kept_rows,
            dropped = self.dropped_rows(),
            imputed_deaths = self.imputed_deaths,
            "Cleaning summary"
        );
        if self.dropped_rows() > 0 {
            tracing::warn!(
                missing_year = self.dropped_missing_year,
                missing_country = self.dropped_missing_country,
                missing_type = self.dropped_missing_type,
                "Dropped rows failing required-field checks"
            );
        }
    }
}

/// Result of one transformation pass.
#[derive(Debug)]
pub struct TransformOutput {
    pub df: DataFrame,
    pub report: CleanReport,
}

/// Handles cleaning and canonicalization of the raw EM-DAT frame.
pub struct DataTransformer;

impl DataTransformer {
    /// Transform the raw EM-DAT frame into the canonical schema.
    ///
    /// When a population table (Country, Year, Population) is supplied, a
    /// `deaths_per_100k` column is derived for exact country/year matches.
    pub fn transform(
        raw_df: &DataFrame,
        population: Option<&DataFrame>,
    ) -> Result<TransformOutput, TransformError> {
        for name in [raw::START_YEAR, raw::COUNTRY, raw::DISASTER_TYPE] {
            if raw_df.column(name).is_err() {
                return Err(TransformError::MissingColumn(name.to_string()));
            }
        }

        let height = raw_df.height();
        let start_years = i64_values(raw_df, raw::START_YEAR)?;
        let end_years = i64_values(raw_df, raw::END_YEAR)?;
        let countries = str_values(raw_df, raw::COUNTRY)?;
        let isos = str_values(raw_df, raw::ISO)?;
        let types = str_values(raw_df, raw::DISASTER_TYPE)?;
        let subtypes = str_values(raw_df, raw::DISASTER_SUBTYPE)?;
        let dis_nos = str_values(raw_df, raw::DIS_NO)?;
        let deaths = f64_values(raw_df, raw::TOTAL_DEATHS)?;
        let affected = f64_values(raw_df, raw::TOTAL_AFFECTED)?;
        let damages = f64_values(raw_df, raw::TOTAL_DAMAGES)?;

        let pop_lookup = population.map(population_lookup).transpose()?;

        let mut report = CleanReport {
            total_rows: height,
            ..CleanReport::default()
        };

        let mut out_dis_no: Vec<String> = Vec::with_capacity(height);
        let mut out_year: Vec<i64> = Vec::with_capacity(height);
        let mut out_end_year: Vec<i64> = Vec::with_capacity(height);
        let mut out_decade: Vec<i64> = Vec::with_capacity(height);
        let mut out_country: Vec<String> = Vec::with_capacity(height);
        let mut out_iso: Vec<Option<String>> = Vec::with_capacity(height);
        let mut out_type: Vec<String> = Vec::with_capacity(height);
        let mut out_subtype: Vec<Option<String>> = Vec::with_capacity(height);
        let mut out_deaths: Vec<f64> = Vec::with_capacity(height);
        let mut out_affected: Vec<Option<f64>> = Vec::with_capacity(height);
        let mut out_damages: Vec<Option<f64>> = Vec::with_capacity(height);
        let mut out_per_100k: Vec<Option<f64>> = Vec::with_capacity(height);

        for i in 0..height {
            let Some(year) = start_years[i] else {
                report.dropped_missing_year += 1;
                continue;
            };
            let Some(country) = countries[i].clone() else {
                report.dropped_missing_country += 1;
                continue;
            };
            let Some(disaster_type) = types[i].clone() else {
                report.dropped_missing_type += 1;
                continue;
            };

            let total_deaths = match deaths[i] {
                Some(v) if !v.is_nan() => v,
                _ => {
                    report.imputed_deaths += 1;
                    0.0
                }
            };

            // Events reported as ending before they start keep the start year.
            let end_year = end_years[i].filter(|e| *e >= year).unwrap_or(year);

            let per_100k = pop_lookup.as_ref().and_then(|lookup| {
                lookup
                    .get(&(country.clone(), year))
                    .filter(|pop| **pop > 0.0)
                    .map(|pop| total_deaths / pop * 100_000.0)
            });

            out_dis_no.push(
                dis_nos[i]
                    .clone()
                    .unwrap_or_else(|| format!("{}-{:05}", year, i)),
            );
            out_year.push(year);
            out_end_year.push(end_year);
            out_decade.push(year.div_euclid(10) * 10);
            out_country.push(country);
            out_iso.push(isos[i].clone());
            out_type.push(disaster_type);
            out_subtype.push(subtypes[i].clone());
            out_deaths.push(total_deaths);
            out_affected.push(affected[i].filter(|v| !v.is_nan()));
            out_damages.push(damages[i].filter(|v| !v.is_nan()));
            out_per_100k.push(per_100k);
        }

        report.kept_rows = out_year.len();

        let df = DataFrame::new(vec![
            Column::new(canon::DIS_NO.into(), out_dis_no),
            Column::new(canon::YEAR.into(), out_year),
            Column::new(canon::END_YEAR.into(), out_end_year),
            Column::new(canon::DECADE.into(), out_decade),
            Column::new(canon::COUNTRY.into(), out_country),
            Column::new(canon::ISO.into(), out_iso),
            Column::new(canon::DISASTER_TYPE.into(), out_type),
            Column::new(canon::DISASTER_SUBTYPE.into(), out_subtype),
            Column::new(canon::TOTAL_DEATHS.into(), out_deaths),
            Column::new(canon::TOTAL_AFFECTED.into(), out_affected),
            Column::new(canon::TOTAL_DAMAGES.into(), out_damages),
            Column::new(canon::DEATHS_PER_100K.into(), out_per_100k),
        ])?;

        // Stable row order keeps re-runs over unchanged input byte-identical.
        let df = df
            .lazy()
            .sort(
                [canon::YEAR, canon::COUNTRY, canon::DISASTER_TYPE, canon::DIS_NO],
                SortMultipleOptions::default(),
            )
            .collect()?;

        Ok(TransformOutput { df, report })
    }

    /// Materialize a transformed frame as typed records.
    pub fn records(df: &DataFrame) -> Result<Vec<TransformedRecord>, TransformError> {
        let dis_no = str_values(df, canon::DIS_NO)?;
        let year = i64_values(df, canon::YEAR)?;
        let end_year = i64_values(df, canon::END_YEAR)?;
        let decade = i64_values(df, canon::DECADE)?;
        let country = str_values(df, canon::COUNTRY)?;
        let iso = str_values(df, canon::ISO)?;
        let disaster_type = str_values(df, canon::DISASTER_TYPE)?;
        let disaster_subtype = str_values(df, canon::DISASTER_SUBTYPE)?;
        let total_deaths = f64_values(df, canon::TOTAL_DEATHS)?;
        let total_affected = f64_values(df, canon::TOTAL_AFFECTED)?;
        let total_damages = f64_values(df, canon::TOTAL_DAMAGES)?;
        let deaths_per_100k = f64_values(df, canon::DEATHS_PER_100K)?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let missing = |name: &str| TransformError::MissingColumn(name.to_string());
            records.push(TransformedRecord {
                dis_no: dis_no[i].clone().ok_or_else(|| missing(canon::DIS_NO))?,
                year: year[i].ok_or_else(|| missing(canon::YEAR))?,
                end_year: end_year[i].ok_or_else(|| missing(canon::END_YEAR))?,
                decade: decade[i].ok_or_else(|| missing(canon::DECADE))?,
                country: country[i].clone().ok_or_else(|| missing(canon::COUNTRY))?,
                iso: iso[i].clone(),
                disaster_type: disaster_type[i]
                    .clone()
                    .ok_or_else(|| missing(canon::DISASTER_TYPE))?,
                disaster_subtype: disaster_subtype[i].clone(),
                total_deaths: total_deaths[i].ok_or_else(|| missing(canon::TOTAL_DEATHS))?,
                total_affected: total_affected[i],
                total_damages: total_damages[i],
                deaths_per_100k: deaths_per_100k[i],
            });
        }
        Ok(records)
    }
}

fn population_lookup(df: &DataFrame) -> Result<HashMap<(String, i64), f64>, TransformError> {
    let countries = str_values(df, "Country")?;
    let years = i64_values(df, "Year")?;
    let populations = f64_values(df, "Population")?;

    let mut lookup = HashMap::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(country), Some(year), Some(pop)) =
            (countries[i].clone(), years[i], populations[i])
        {
            lookup.insert((country, year), pop);
        }
    }
    Ok(lookup)
}

/// Extract a column as trimmed strings; an absent column reads as all-null.
fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TransformError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let cast = column.cast(&DataType::String)?;
    let ca = cast.as_materialized_series().str()?;
    Ok(ca
        .into_iter()
        .map(|v| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .collect())
}

fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, TransformError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let cast = column.cast(&DataType::Int64)?;
    Ok(cast.as_materialized_series().i64()?.into_iter().collect())
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, TransformError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.as_materialized_series().f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_fixture() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                raw::DIS_NO.into(),
                vec![
                    Some("1999-0001"),
                    Some("1999-0002"),
                    Some("2000-0001"),
                    None,
                    Some("2000-0003"),
                ],
            ),
            Column::new(
                raw::COUNTRY.into(),
                vec![
                    Some("Austria"),
                    Some("Japan"),
                    Some("  Japan "),
                    Some("Chile"),
                    None,
                ],
            ),
            Column::new(
                raw::DISASTER_TYPE.into(),
                vec![
                    Some("Flood"),
                    Some("Earthquake"),
                    Some("Flood"),
                    Some("Storm"),
                    Some("Storm"),
                ],
            ),
            Column::new(
                raw::START_YEAR.into(),
                vec![Some(1999i64), Some(1999), Some(2000), None, Some(2000)],
            ),
            Column::new(
                raw::END_YEAR.into(),
                vec![Some(1999i64), Some(2001), None, Some(2001), Some(2000)],
            ),
            Column::new(
                raw::TOTAL_DEATHS.into(),
                vec![Some(12.0f64), Some(300.0), None, Some(7.0), Some(4.0)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn drops_and_counts_invalid_rows() {
        let out = DataTransformer::transform(&raw_fixture(), None).unwrap();

        assert_eq!(out.report.total_rows, 5);
        assert_eq!(out.report.kept_rows, 3);
        assert_eq!(out.report.dropped_missing_year, 1);
        assert_eq!(out.report.dropped_missing_country, 1);
        assert_eq!(out.report.dropped_missing_type, 0);
        assert_eq!(out.report.imputed_deaths, 1);
        assert_eq!(out.df.height(), 3);
    }

    #[test]
    fn required_fields_are_typed_and_non_missing() {
        let out = DataTransformer::transform(&raw_fixture(), None).unwrap();
        let records = DataTransformer::records(&out.df).unwrap();

        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(!record.country.is_empty());
            assert!(!record.disaster_type.is_empty());
            assert!(record.total_deaths >= 0.0);
            assert!(record.end_year >= record.year);
        }
    }

    #[test]
    fn derives_decade_and_defaults_end_year() {
        let out = DataTransformer::transform(&raw_fixture(), None).unwrap();
        let records = DataTransformer::records(&out.df).unwrap();

        let flood_2000 = records
            .iter()
            .find(|r| r.dis_no == "2000-0001")
            .unwrap();
        assert_eq!(flood_2000.decade, 2000);
        assert_eq!(flood_2000.end_year, 2000);
        assert_eq!(flood_2000.country, "Japan");
        assert_eq!(flood_2000.total_deaths, 0.0);
    }

    #[test]
    fn rows_are_sorted_for_determinism() {
        let out = DataTransformer::transform(&raw_fixture(), None).unwrap();
        let records = DataTransformer::records(&out.df).unwrap();

        let keys: Vec<_> = records
            .iter()
            .map(|r| (r.year, r.country.clone(), r.disaster_type.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn per_capita_deaths_join_on_country_and_year() {
        let population = DataFrame::new(vec![
            Column::new("Country".into(), vec!["Austria", "Japan"]),
            Column::new("Year".into(), vec![1999i64, 1999]),
            Column::new("Population".into(), vec![8_000_000.0f64, 126_000_000.0]),
        ])
        .unwrap();

        let out = DataTransformer::transform(&raw_fixture(), Some(&population)).unwrap();
        let records = DataTransformer::records(&out.df).unwrap();

        let austria = records.iter().find(|r| r.country == "Austria").unwrap();
        let expected = 12.0 / 8_000_000.0 * 100_000.0;
        assert!((austria.deaths_per_100k.unwrap() - expected).abs() < 1e-12);

        // No population row for Japan/2000, so the derived field stays null.
        let japan_2000 = records
            .iter()
            .find(|r| r.country == "Japan" && r.year == 2000)
            .unwrap();
        assert!(japan_2000.deaths_per_100k.is_none());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let df = DataFrame::new(vec![Column::new(
            raw::COUNTRY.into(),
            vec!["Austria"],
        )])
        .unwrap();
        let err = DataTransformer::transform(&df, None).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(_)));
    }
}
