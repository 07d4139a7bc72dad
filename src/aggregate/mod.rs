//! Aggregation Stage
//! Groups transformed records along configurable dimension sets and computes
//! counts and sums, ordered by year ascending.

use polars::prelude::*;
use thiserror::Error;

use crate::data::schema::canon;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Grouping dimension set for one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Year,
    YearCountry,
    YearType,
}

impl Dimension {
    /// Grouping key columns, year first.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Dimension::Year => &[canon::YEAR],
            Dimension::YearCountry => &[canon::YEAR, canon::COUNTRY],
            Dimension::YearType => &[canon::YEAR, canon::DISASTER_TYPE],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::YearCountry => "year_country",
            Dimension::YearType => "year_type",
        }
    }
}

/// One summary row, keyed by the grouping dimension values.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub year: i64,
    pub country: Option<String>,
    pub disaster_type: Option<String>,
    pub disasters: u32,
    pub total_deaths: f64,
    pub total_affected: f64,
    pub total_damages: f64,
}

pub const DISASTER_COUNT: &str = "disasters";

/// Computes grouped summaries over the transformed frame.
pub struct Aggregator;

impl Aggregator {
    /// Group the transformed frame by `dimension` and compute per-group
    /// disaster counts and death/affected/damage sums.
    pub fn summarize(df: &DataFrame, dimension: Dimension) -> Result<DataFrame, AggregateError> {
        let keys: Vec<Expr> = dimension.key_columns().iter().map(|c| col(*c)).collect();

        let out = df
            .clone()
            .lazy()
            .group_by(keys)
            .agg([
                len().alias(DISASTER_COUNT),
                col(canon::TOTAL_DEATHS).sum().alias(canon::TOTAL_DEATHS),
                col(canon::TOTAL_AFFECTED).sum().alias(canon::TOTAL_AFFECTED),
                col(canon::TOTAL_DAMAGES).sum().alias(canon::TOTAL_DAMAGES),
            ])
            .sort(dimension.key_columns().to_vec(), SortMultipleOptions::default())
            .collect()?;

        Ok(out)
    }

    /// Materialize a summary frame as typed rows.
    pub fn rows(df: &DataFrame, dimension: Dimension) -> Result<Vec<AggregateRow>, AggregateError> {
        let years = cast_i64(df, canon::YEAR)?;
        let counts = cast_u32(df, DISASTER_COUNT)?;
        let deaths = cast_f64(df, canon::TOTAL_DEATHS)?;
        let affected = cast_f64(df, canon::TOTAL_AFFECTED)?;
        let damages = cast_f64(df, canon::TOTAL_DAMAGES)?;

        let countries = match dimension {
            Dimension::YearCountry => Some(cast_str(df, canon::COUNTRY)?),
            _ => None,
        };
        let types = match dimension {
            Dimension::YearType => Some(cast_str(df, canon::DISASTER_TYPE)?),
            _ => None,
        };

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            rows.push(AggregateRow {
                year: years[i].unwrap_or_default(),
                country: countries.as_ref().and_then(|c| c[i].clone()),
                disaster_type: types.as_ref().and_then(|t| t[i].clone()),
                disasters: counts[i].unwrap_or_default(),
                total_deaths: deaths[i].unwrap_or_default(),
                total_affected: affected[i].unwrap_or_default(),
                total_damages: damages[i].unwrap_or_default(),
            });
        }
        Ok(rows)
    }

    /// Total deaths computed directly over the transformed frame, used to
    /// reconcile aggregate output against its source.
    pub fn total_deaths(df: &DataFrame) -> Result<f64, AggregateError> {
        let deaths = cast_f64(df, canon::TOTAL_DEATHS)?;
        Ok(deaths.iter().flatten().sum())
    }
}

fn cast_i64(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, AggregateError> {
    let cast = df.column(name)?.cast(&DataType::Int64)?;
    Ok(cast.as_materialized_series().i64()?.into_iter().collect())
}

fn cast_u32(df: &DataFrame, name: &str) -> Result<Vec<Option<u32>>, AggregateError> {
    let cast = df.column(name)?.cast(&DataType::UInt32)?;
    Ok(cast.as_materialized_series().u32()?.into_iter().collect())
}

fn cast_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, AggregateError> {
    let cast = df.column(name)?.cast(&DataType::Float64)?;
    Ok(cast.as_materialized_series().f64()?.into_iter().collect())
}

fn cast_str(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, AggregateError> {
    let cast = df.column(name)?.cast(&DataType::String)?;
    Ok(cast
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::raw;
    use crate::data::DataTransformer;

    /// Three records spanning two years and two countries.
    fn transformed_fixture() -> DataFrame {
        let raw_df = DataFrame::new(vec![
            Column::new(
                raw::DIS_NO.into(),
                vec!["1999-0001", "1999-0002", "2000-0001"],
            ),
            Column::new(raw::COUNTRY.into(), vec!["Austria", "Japan", "Japan"]),
            Column::new(
                raw::DISASTER_TYPE.into(),
                vec!["Flood", "Earthquake", "Flood"],
            ),
            Column::new(raw::START_YEAR.into(), vec![1999i64, 1999, 2000]),
            Column::new(raw::END_YEAR.into(), vec![1999i64, 1999, 2000]),
            Column::new(raw::TOTAL_DEATHS.into(), vec![12.0f64, 300.0, 25.0]),
            Column::new(raw::TOTAL_AFFECTED.into(), vec![100.0f64, 9000.0, 450.0]),
            Column::new(raw::TOTAL_DAMAGES.into(), vec![5.0f64, 80.0, 10.0]),
        ])
        .unwrap();
        DataTransformer::transform(&raw_df, None).unwrap().df
    }

    #[test]
    fn yearly_aggregate_matches_hand_computed_totals() {
        let df = transformed_fixture();
        let summary = Aggregator::summarize(&df, Dimension::Year).unwrap();
        let rows = Aggregator::rows(&summary, Dimension::Year).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 1999);
        assert_eq!(rows[0].disasters, 2);
        assert_eq!(rows[0].total_deaths, 312.0);
        assert_eq!(rows[0].total_affected, 9100.0);
        assert_eq!(rows[1].year, 2000);
        assert_eq!(rows[1].disasters, 1);
        assert_eq!(rows[1].total_deaths, 25.0);
    }

    #[test]
    fn aggregates_reconcile_with_transformed_totals() {
        let df = transformed_fixture();
        let direct_total = Aggregator::total_deaths(&df).unwrap();

        for dimension in [Dimension::Year, Dimension::YearCountry, Dimension::YearType] {
            let summary = Aggregator::summarize(&df, dimension).unwrap();
            let rows = Aggregator::rows(&summary, dimension).unwrap();
            let grouped_total: f64 = rows.iter().map(|r| r.total_deaths).sum();
            let grouped_count: u32 = rows.iter().map(|r| r.disasters).sum();
            assert_eq!(grouped_total, direct_total);
            assert_eq!(grouped_count, df.height() as u32);
        }
    }

    #[test]
    fn rows_are_ordered_by_year_then_secondary_key() {
        let df = transformed_fixture();
        let summary = Aggregator::summarize(&df, Dimension::YearCountry).unwrap();
        let rows = Aggregator::rows(&summary, Dimension::YearCountry).unwrap();

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.year, r.country.clone().unwrap()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1999, "Austria".to_string()),
                (1999, "Japan".to_string()),
                (2000, "Japan".to_string()),
            ]
        );
    }
}
