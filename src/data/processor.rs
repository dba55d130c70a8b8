//! Data Processor Module
//! Row filters applied before the dashboard aggregates a table.

use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
}

/// Handles row filtering; every operation returns a new DataFrame.
pub struct DataProcessor;

impl DataProcessor {
    /// Keep rows whose numeric value lies in `lo..=hi`. Nulls are dropped.
    pub fn filter_range(
        df: &DataFrame,
        column: &str,
        lo: f64,
        hi: f64,
    ) -> Result<DataFrame, ProcessorError> {
        let values = Self::column(df, column)?.cast(&DataType::Float64)?;
        let mask: BooleanChunked = values
            .f64()?
            .into_iter()
            .map(|v| Some(v.is_some_and(|v| v >= lo && v <= hi)))
            .collect();

        Ok(df.filter(&mask)?)
    }

    /// Drop rows whose value equals `value`. Rows with a null value are kept.
    pub fn exclude_value(
        df: &DataFrame,
        column: &str,
        value: &str,
    ) -> Result<DataFrame, ProcessorError> {
        let values = Self::column(df, column)?.cast(&DataType::String)?;
        let mask: BooleanChunked = values
            .str()?
            .into_iter()
            .map(|v| Some(v != Some(value)))
            .collect();

        Ok(df.filter(&mask)?)
    }

    fn column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Column, ProcessorError> {
        df.column(column)
            .map_err(|_| ProcessorError::MissingColumn(column.to_string()))
    }
}
