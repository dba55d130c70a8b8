//! Dataset Loader Module
//! Reads delimited text and spreadsheet files into Polars DataFrames.

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Rows scanned when inferring CSV column types.
const INFER_SCHEMA_ROWS: usize = 10000;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("No input files given")]
    NoData,
}

/// Declared input format, taken from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text with the given separator byte.
    Delimited(u8),
    /// Excel or OpenDocument workbook; only the first sheet is read.
    Spreadsheet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Delimited(b',')),
            "tsv" | "tab" => Some(FileFormat::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(FileFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// Reads tabular source files. Stateless; results are cached by the session.
pub struct DataLoader;

impl DataLoader {
    /// Load a single file, picking the reader from its extension.
    pub fn load(path: &Path) -> Result<DataFrame, LoaderError> {
        let format = FileFormat::from_path(path).ok_or_else(|| LoaderError::Parse {
            path: path.to_path_buf(),
            message: "unrecognized file format".to_string(),
        })?;

        // Surface missing or unreadable files as IO errors rather than parser noise
        File::open(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let df = match format {
            FileFormat::Delimited(separator) => Self::read_delimited(path, separator)?,
            FileFormat::Spreadsheet => Self::read_spreadsheet(path)?,
        };

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded table"
        );
        Ok(df)
    }

    /// Load several files with the same columns and stack them in order.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<DataFrame, LoaderError> {
        let mut iter = paths.iter();
        let first = iter.next().ok_or(LoaderError::NoData)?;
        let mut df = Self::load(first.as_ref())?;

        for path in iter {
            let path = path.as_ref();
            let next = Self::load(path)?;
            df.vstack_mut(&next).map_err(|e| LoaderError::Parse {
                path: path.to_path_buf(),
                message: format!("columns do not match previous input: {e}"),
            })?;
        }

        Ok(df)
    }

    /// Load and drop every row that has a missing value in any column.
    ///
    /// Callers that need partial rows must use [`DataLoader::load_all`] instead.
    pub fn load_complete<P: AsRef<Path>>(paths: &[P]) -> Result<DataFrame, LoaderError> {
        let df = Self::load_all(paths)?;
        let before = df.height();
        let df = df.drop_nulls::<String>(None)?;
        debug!(dropped = before - df.height(), "dropped incomplete rows");
        Ok(df)
    }

    /// Get list of numeric column names.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| is_numeric(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame, LoaderError> {
        LazyCsvReader::new(path)
            .with_separator(separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| LoaderError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn read_spreadsheet(path: &Path) -> Result<DataFrame, LoaderError> {
        let parse_error = |message: String| LoaderError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| parse_error("workbook has no worksheets".to_string()))?
            .map_err(|e| parse_error(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| parse_error("worksheet is empty".to_string()))?
            .iter()
            .map(|cell| cell.to_string())
            .collect();

        let mut cells: Vec<Vec<Option<&Data>>> = vec![Vec::new(); header.len()];
        for row in rows {
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(row.get(i));
            }
        }

        let columns: Vec<Column> = header
            .iter()
            .zip(cells.iter())
            .map(|(name, column)| sniff_column(name, column))
            .collect();

        DataFrame::new(columns).map_err(|e| parse_error(e.to_string()))
    }
}

/// Whether a dtype holds numbers the aggregations can use.
pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Build a numeric column when every non-empty cell is a number, text otherwise.
fn sniff_column(name: &str, cells: &[Option<&Data>]) -> Column {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None | Some(Data::Empty) => Some(None),
            Some(Data::Int(v)) => Some(Some(*v as f64)),
            Some(Data::Float(v)) => Some(Some(*v)),
            Some(Data::String(s)) if s.trim().is_empty() => Some(None),
            Some(Data::String(s)) => s.trim().parse::<f64>().ok().map(Some),
            Some(_) => None,
        })
        .collect();

    match numbers {
        Some(values) => Column::new(name.into(), values),
        None => {
            let texts: Vec<Option<String>> = cells
                .iter()
                .map(|cell| match cell {
                    None | Some(Data::Empty) => None,
                    Some(cell) => Some(cell.to_string()),
                })
                .collect();
            Column::new(name.into(), texts)
        }
    }
}
