//! Spatial module - reference polygons and the geo-enrichment join

mod enrich;
mod reference;

pub use enrich::{enrich, JoinPolicy, CONTINENT_COLUMN, COUNTRY_COLUMN};
pub use reference::{CountryPolygon, ReferenceProperties, ReferenceSet};

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse reference polygons: {0}")]
    Parse(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Nothing to enrich: {0}")]
    EmptyInput(String),
    #[error("Landing at row {row} lies in more than one polygon: {}", countries.join(", "))]
    JoinAmbiguity { row: usize, countries: Vec<String> },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}
