//! CSV export of loaded or derived tables.

use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a table as comma-separated text with a header row.
pub fn export_csv<W: Write>(df: &DataFrame, writer: W) -> PolarsResult<()> {
    let mut df = df.clone();
    CsvWriter::new(writer)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
}

/// Serialize a table to CSV bytes, e.g. for a download button.
pub fn to_csv_bytes(df: &DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buf = Vec::new();
    export_csv(df, &mut buf)?;
    Ok(buf)
}

/// Write a table to a CSV file, creating or truncating it.
pub fn write_csv_file(df: &DataFrame, path: &Path) -> PolarsResult<()> {
    let file = File::create(path)?;
    export_csv(df, file)
}
