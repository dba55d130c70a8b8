//! View Calculator Module
//! Small aggregate tables behind each dashboard chart.

use crate::data::ProcessorError;
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub const COUNT_COLUMN: &str = "count";
pub const PERCENTAGE_COLUMN: &str = "Percentage";
pub const RUNNING_TOTAL_COLUMN: &str = "Running Total";

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Nothing to aggregate for {0}")]
    EmptyInput(String),
}

impl From<ProcessorError> for ViewError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::PolarsError(e) => ViewError::PolarsError(e),
            ProcessorError::MissingColumn(name) => {
                ViewError::Schema(format!("column '{name}' not found"))
            }
        }
    }
}

/// Builds aggregate views. Every method returns a fresh DataFrame.
pub struct ViewCalculator;

impl ViewCalculator {
    /// Share of rows per category as a percentage of all categorized rows.
    ///
    /// Output columns: [column, "count", "Percentage"], largest first.
    pub fn percentage_of_total(df: &DataFrame, column: &str) -> Result<DataFrame, ViewError> {
        let counts = Self::ranked_counts(df, column)?;
        let total: u32 = counts.iter().map(|(_, c)| c).sum();

        let (names, counts): (Vec<String>, Vec<u32>) = counts.into_iter().unzip();
        let percentages: Vec<f64> = counts
            .iter()
            .map(|&c| 100.0 * c as f64 / total as f64)
            .collect();

        Ok(DataFrame::new(vec![
            Column::new(column.into(), names),
            Column::new(COUNT_COLUMN.into(), counts),
            Column::new(PERCENTAGE_COLUMN.into(), percentages),
        ])?)
    }

    /// Percentage of categorized rows equal to `value`; 0.0 when it never occurs.
    pub fn share_of(df: &DataFrame, column: &str, value: &str) -> Result<f64, ViewError> {
        let counts = Self::ranked_counts(df, column)?;
        let total: u32 = counts.iter().map(|(_, c)| c).sum();
        let hits = counts
            .iter()
            .find(|(name, _)| name == value)
            .map_or(0, |(_, c)| *c);
        Ok(100.0 * hits as f64 / total as f64)
    }

    /// The `n` most frequent categories, ties in first-seen order.
    ///
    /// Output columns: [column, "count"].
    pub fn top_n(df: &DataFrame, column: &str, n: usize) -> Result<DataFrame, ViewError> {
        let mut counts = Self::ranked_counts(df, column)?;
        counts.truncate(n);

        let (names, counts): (Vec<String>, Vec<u32>) = counts.into_iter().unzip();
        Ok(DataFrame::new(vec![
            Column::new(column.into(), names),
            Column::new(COUNT_COLUMN.into(), counts),
        ])?)
    }

    /// Mean of `value` per category, rounded half to even, largest first.
    ///
    /// Categories without any value are left out. The category column keeps its
    /// source dtype. Output columns: [category, value].
    pub fn group_mean(
        df: &DataFrame,
        category: &str,
        value: &str,
        limit: Option<usize>,
    ) -> Result<DataFrame, ViewError> {
        let keys = Self::category_keys(df, category)?;
        let values = Self::column(df, value)?;
        if !crate::data::is_numeric(values.dtype()) && values.dtype() != &DataType::Null {
            return Err(ViewError::Schema(format!("column '{value}' must be numeric")));
        }
        Self::ensure_rows(df, category)?;
        let values = values.cast(&DataType::Float64)?;

        // First row of each category, in first-seen order
        let mut order: Vec<(String, IdxSize)> = Vec::new();
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
        for (row, (key, v)) in keys.into_iter().zip(values.f64()?.into_iter()).enumerate() {
            let (Some(key), Some(v)) = (key, v) else {
                continue;
            };
            if v.is_nan() {
                continue;
            }
            groups
                .entry(key)
                .or_insert_with_key(|k| {
                    order.push((k.clone(), row as IdxSize));
                    Vec::new()
                })
                .push(v);
        }

        let mut means: Vec<(IdxSize, f64)> = order
            .into_iter()
            .filter_map(|(key, row)| {
                let values = groups.remove(&key)?;
                let mean = values.iter().mean().round_ties_even();
                Some((row, mean))
            })
            .collect();

        if means.is_empty() {
            return Err(ViewError::EmptyInput(format!("mean of '{value}'")));
        }

        means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = limit {
            means.truncate(limit);
        }

        let (rows, means): (Vec<IdxSize>, Vec<f64>) = means.into_iter().unzip();
        let names = Self::column(df, category)?
            .as_materialized_series()
            .take(&IdxCa::from_vec(category.into(), rows))?;

        Ok(DataFrame::new(vec![
            Column::from(names),
            Column::new(value.into(), means),
        ])?)
    }

    /// Row count per integer time bucket, ascending.
    ///
    /// Output columns: [column, "count"].
    pub fn count_per_bucket(df: &DataFrame, column: &str) -> Result<DataFrame, ViewError> {
        let buckets = Self::bucket_keys(df, column)?;
        Self::ensure_rows(df, column)?;

        let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
        for bucket in buckets.into_iter().flatten() {
            *counts.entry(bucket).or_default() += 1;
        }
        if counts.is_empty() {
            return Err(ViewError::EmptyInput(format!("counts per '{column}'")));
        }

        let (buckets, counts): (Vec<i64>, Vec<u32>) = counts.into_iter().unzip();
        Ok(DataFrame::new(vec![
            Column::new(column.into(), buckets),
            Column::new(COUNT_COLUMN.into(), counts),
        ])?)
    }

    /// Per-category cumulative row count over ascending time buckets.
    ///
    /// Each category accumulates on its own regardless of input row order.
    /// Output columns: [time, category, "count", "Running Total"], ordered by
    /// category then time.
    pub fn running_total(
        df: &DataFrame,
        time: &str,
        category: &str,
    ) -> Result<DataFrame, ViewError> {
        let buckets = Self::bucket_keys(df, time)?;
        let keys = Self::category_keys(df, category)?;
        Self::ensure_rows(df, category)?;

        let mut counts: BTreeMap<(String, i64), u32> = BTreeMap::new();
        for (bucket, key) in buckets.into_iter().zip(keys) {
            if let (Some(bucket), Some(key)) = (bucket, key) {
                *counts.entry((key, bucket)).or_default() += 1;
            }
        }
        if counts.is_empty() {
            return Err(ViewError::EmptyInput(format!(
                "running total of '{category}' over '{time}'"
            )));
        }

        let mut times = Vec::with_capacity(counts.len());
        let mut names: Vec<String> = Vec::with_capacity(counts.len());
        let mut per_bucket = Vec::with_capacity(counts.len());
        let mut totals = Vec::with_capacity(counts.len());
        let mut running = 0u32;

        for ((key, bucket), count) in counts {
            if names.last() != Some(&key) {
                running = 0;
            }
            running += count;
            times.push(bucket);
            names.push(key);
            per_bucket.push(count);
            totals.push(running);
        }

        Ok(DataFrame::new(vec![
            Column::new(time.into(), times),
            Column::new(category.into(), names),
            Column::new(COUNT_COLUMN.into(), per_bucket),
            Column::new(RUNNING_TOTAL_COLUMN.into(), totals),
        ])?)
    }

    /// Non-null category counts, descending, ties in first-seen order.
    fn ranked_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, u32)>, ViewError> {
        let keys = Self::category_keys(df, column)?;
        Self::ensure_rows(df, column)?;

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<(String, u32)> = Vec::new();
        for key in keys.into_iter().flatten() {
            match index.get(&key) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(key.clone(), counts.len());
                    counts.push((key, 1));
                }
            }
        }

        if counts.is_empty() {
            return Err(ViewError::EmptyInput(format!("categories of '{column}'")));
        }

        // Stable sort keeps first-seen order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts)
    }

    fn ensure_rows(df: &DataFrame, what: &str) -> Result<(), ViewError> {
        if df.height() == 0 {
            return Err(ViewError::EmptyInput(format!("'{what}' (table has no rows)")));
        }
        Ok(())
    }

    fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ViewError> {
        df.column(name)
            .map_err(|_| ViewError::Schema(format!("column '{name}' not found")))
    }

    fn category_keys(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, ViewError> {
        let values = Self::column(df, column)?.cast(&DataType::String)?;
        Ok(values
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    fn bucket_keys(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>, ViewError> {
        let values = Self::column(df, column)?;
        if !crate::data::is_numeric(values.dtype()) {
            return Err(ViewError::Schema(format!(
                "time column '{column}' must be numeric"
            )));
        }
        let values = values.cast(&DataType::Int64)?;
        Ok(values.i64()?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(df: &DataFrame, column: &str) -> Vec<String> {
        df.column(column)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn u32s(df: &DataFrame, column: &str) -> Vec<u32> {
        df.column(column)
            .unwrap()
            .u32()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect()
    }

    fn repeated(counts: &[(&str, usize)]) -> DataFrame {
        let values: Vec<&str> = counts
            .iter()
            .flat_map(|(name, n)| std::iter::repeat(*name).take(*n))
            .collect();
        df! { "class" => values }.unwrap()
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let df = repeated(&[("A", 3), ("B", 5), ("C", 1)]);
        let out = ViewCalculator::percentage_of_total(&df, "class").unwrap();

        let total: f64 = out
            .column(PERCENTAGE_COLUMN)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(strings(&out, "class"), vec!["B", "A", "C"]);
    }

    #[test]
    fn single_continent_is_the_whole_pie() {
        let df = df! { "Continent Name" => ["Antarctica"] }.unwrap();
        let out = ViewCalculator::percentage_of_total(&df, "Continent Name").unwrap();
        let pct = out.column(PERCENTAGE_COLUMN).unwrap().f64().unwrap().get(0);
        assert_eq!(pct, Some(100.0));
    }

    #[test]
    fn share_of_absent_category_is_zero() {
        let df = df! { "Continent Name" => ["Asia", "Europe", "Asia", "Africa"] }.unwrap();
        assert_eq!(
            ViewCalculator::share_of(&df, "Continent Name", "Antarctica").unwrap(),
            0.0
        );
        assert_eq!(
            ViewCalculator::share_of(&df, "Continent Name", "Asia").unwrap(),
            50.0
        );
    }

    #[test]
    fn top_n_truncates_in_count_order() {
        let df = repeated(&[("C", 20), ("A", 50), ("B", 30)]);
        let out = ViewCalculator::top_n(&df, "class", 2).unwrap();
        assert_eq!(strings(&out, "class"), vec!["A", "B"]);
        assert_eq!(u32s(&out, COUNT_COLUMN), vec![50, 30]);
    }

    #[test]
    fn top_n_ties_keep_first_seen_order_and_repeat() {
        let df = df! { "class" => ["H5", "L6", "L6", "H5", "CM2", "LL5"] }.unwrap();
        let first = ViewCalculator::top_n(&df, "class", 3).unwrap();
        let second = ViewCalculator::top_n(&df, "class", 3).unwrap();

        assert_eq!(strings(&first, "class"), vec!["H5", "L6", "CM2"]);
        assert!(first.equals(&second));
    }

    #[test]
    fn top_n_with_few_categories_returns_all() {
        let df = repeated(&[("A", 2), ("B", 1)]);
        let out = ViewCalculator::top_n(&df, "class", 15).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn group_mean_rounds_and_skips_empty_groups() {
        let df = df! {
            "recclass" => ["Iron", "Iron", "L6", "H5", "H5"],
            "mass (g)" => [Some(2.5), Some(2.5), None, Some(1.0), Some(2.0)],
        }
        .unwrap();

        let out = ViewCalculator::group_mean(&df, "recclass", "mass (g)", None).unwrap();
        assert_eq!(strings(&out, "recclass"), vec!["Iron", "H5"]);
        let means: Vec<Option<f64>> = out.column("mass (g)").unwrap().f64().unwrap().into_iter().collect();
        // 2.5 and 1.5 both round to 2 under half-to-even
        assert_eq!(means, vec![Some(2.0), Some(2.0)]);
    }

    #[test]
    fn group_mean_limit_and_all_missing() {
        let df = df! {
            "year" => [1990i64, 1991, 1992],
            "mass (g)" => [10.0, 30.0, 20.0],
        }
        .unwrap();
        let out = ViewCalculator::group_mean(&df, "year", "mass (g)", Some(2)).unwrap();
        let years: Vec<Option<i64>> = out.column("year").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(1991), Some(1992)]);

        let empty = df! {
            "year" => [1990i64],
            "mass (g)" => [None::<f64>],
        }
        .unwrap();
        let err = ViewCalculator::group_mean(&empty, "year", "mass (g)", None).unwrap_err();
        assert!(matches!(err, ViewError::EmptyInput(_)));
    }

    #[test]
    fn count_per_bucket_is_sorted() {
        let df = df! { "year" => [Some(2001i64), Some(1999), None, Some(2001), Some(1000)] }.unwrap();
        let out = ViewCalculator::count_per_bucket(&df, "year").unwrap();
        let years: Vec<Option<i64>> = out.column("year").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(1000), Some(1999), Some(2001)]);
        assert_eq!(u32s(&out, COUNT_COLUMN), vec![1, 1, 2]);
    }

    #[test]
    fn running_total_is_independent_per_category() {
        // Rows deliberately interleaved across categories and years
        let df = df! {
            "year" => [1991i64, 1990, 1990, 1991, 1990, 1990, 1990, 1991, 1990, 1990],
            "Continent Name" => ["A", "B", "A", "A", "B", "B", "A", "A", "B", "B"],
        }
        .unwrap();

        let out = ViewCalculator::running_total(&df, "year", "Continent Name").unwrap();
        assert_eq!(strings(&out, "Continent Name"), vec!["A", "A", "B"]);
        let years: Vec<Option<i64>> = out.column("year").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(1990), Some(1991), Some(1990)]);
        assert_eq!(u32s(&out, COUNT_COLUMN), vec![2, 3, 5]);
        assert_eq!(u32s(&out, RUNNING_TOTAL_COLUMN), vec![2, 5, 5]);
    }

    #[test]
    fn running_total_never_decreases() {
        let df = df! {
            "year" => [2000i64, 1995, 2000, 2010, 1995, 2005],
            "Continent Name" => ["Asia", "Asia", "Asia", "Asia", "Africa", "Asia"],
        }
        .unwrap();

        let out = ViewCalculator::running_total(&df, "year", "Continent Name").unwrap();
        let names = strings(&out, "Continent Name");
        let totals = u32s(&out, RUNNING_TOTAL_COLUMN);
        for i in 1..totals.len() {
            if names[i] == names[i - 1] {
                assert!(totals[i] >= totals[i - 1]);
            }
        }
        assert_eq!(totals.last(), Some(&5));
    }

    #[test]
    fn empty_table_is_signalled() {
        let df = df! { "class" => Vec::<&str>::new() }.unwrap();
        for result in [
            ViewCalculator::top_n(&df, "class", 10).map(|_| ()),
            ViewCalculator::percentage_of_total(&df, "class").map(|_| ()),
            ViewCalculator::share_of(&df, "class", "L6").map(|_| ()),
        ] {
            assert!(matches!(result, Err(ViewError::EmptyInput(_))));
        }
    }

    #[test]
    fn unknown_column_on_empty_table_is_schema_error() {
        let df = df! {
            "year" => Vec::<i64>::new(),
            "class" => Vec::<&str>::new(),
        }
        .unwrap();
        for result in [
            ViewCalculator::top_n(&df, "recclass", 10).map(|_| ()),
            ViewCalculator::group_mean(&df, "class", "mass", None).map(|_| ()),
            ViewCalculator::count_per_bucket(&df, "yaer").map(|_| ()),
            ViewCalculator::running_total(&df, "year", "continent").map(|_| ()),
        ] {
            assert!(matches!(result, Err(ViewError::Schema(_))));
        }
    }

    #[test]
    fn missing_column_is_schema_error() {
        let df = df! { "class" => ["L6"] }.unwrap();
        let err = ViewCalculator::top_n(&df, "recclass", 1).unwrap_err();
        assert!(matches!(err, ViewError::Schema(_)));
    }
}
