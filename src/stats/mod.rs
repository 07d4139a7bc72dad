//! Stats module - trend and correlation analysis

mod calculator;

pub use calculator::{
    Correlation, StatsError, TrendCalculator, TrendLine, BASELINE_SPAN_YEARS,
    SIGNIFICANCE_THRESHOLD,
};
