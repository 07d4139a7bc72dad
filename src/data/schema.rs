//! Canonical EM-DAT Column Schema
//! Raw export headers are renamed to a snake_case schema during transformation.

/// Column names as they appear in the raw EM-DAT export.
pub mod raw {
    pub const DIS_NO: &str = "Dis_No";
    pub const COUNTRY: &str = "Country";
    pub const ISO: &str = "ISO";
    pub const DISASTER_TYPE: &str = "Disaster_Type";
    pub const DISASTER_SUBTYPE: &str = "Disaster_Subtype";
    pub const START_YEAR: &str = "Start_Year";
    pub const END_YEAR: &str = "End_Year";
    pub const TOTAL_DEATHS: &str = "Total_Deaths";
    pub const TOTAL_AFFECTED: &str = "Total_Affected";
    pub const TOTAL_DAMAGES: &str = "Total_Damages";
}

/// Canonical column names of the transformed dataset.
pub mod canon {
    pub const DIS_NO: &str = "dis_no";
    pub const YEAR: &str = "year";
    pub const END_YEAR: &str = "end_year";
    pub const DECADE: &str = "decade";
    pub const COUNTRY: &str = "country";
    pub const ISO: &str = "iso";
    pub const DISASTER_TYPE: &str = "disaster_type";
    pub const DISASTER_SUBTYPE: &str = "disaster_subtype";
    pub const TOTAL_DEATHS: &str = "total_deaths";
    pub const TOTAL_AFFECTED: &str = "total_affected";
    pub const TOTAL_DAMAGES: &str = "total_damages";
    pub const DEATHS_PER_100K: &str = "deaths_per_100k";
}

/// Fixed column order of `emdat_transformed.csv`.
pub const OUTPUT_COLUMNS: [&str; 12] = [
    canon::DIS_NO,
    canon::YEAR,
    canon::END_YEAR,
    canon::DECADE,
    canon::COUNTRY,
    canon::ISO,
    canon::DISASTER_TYPE,
    canon::DISASTER_SUBTYPE,
    canon::TOTAL_DEATHS,
    canon::TOTAL_AFFECTED,
    canon::TOTAL_DAMAGES,
    canon::DEATHS_PER_100K,
];

/// One cleaned disaster event. Each record traces back to exactly one raw
/// EM-DAT row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    pub dis_no: String,
    pub year: i64,
    pub end_year: i64,
    pub decade: i64,
    pub country: String,
    pub iso: Option<String>,
    pub disaster_type: String,
    pub disaster_subtype: Option<String>,
    pub total_deaths: f64,
    pub total_affected: Option<f64>,
    pub total_damages: Option<f64>,
    pub deaths_per_100k: Option<f64>,
}
