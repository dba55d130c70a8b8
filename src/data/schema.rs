//! Landing Schema Module
//! Names the required landing columns, validates them and exposes typed rows.

use super::loader::{is_numeric, LoaderError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Source column names of the landing table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingSchema {
    pub id: String,
    pub class: String,
    pub mass: String,
    pub latitude: String,
    pub longitude: String,
    pub year: String,
}

impl Default for LandingSchema {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            class: "recclass".to_string(),
            mass: "mass (g)".to_string(),
            latitude: "reclat".to_string(),
            longitude: "reclong".to_string(),
            year: "year".to_string(),
        }
    }
}

/// One landing row with typed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingRecord {
    pub id: String,
    pub class: Option<String>,
    pub mass: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year: Option<i64>,
}

impl LandingSchema {
    fn numeric_columns(&self) -> [&str; 4] {
        [&self.mass, &self.latitude, &self.longitude, &self.year]
    }

    /// Check required columns and cast them to their canonical types.
    ///
    /// Year becomes Int64, mass and coordinates Float64, class String.
    /// Other columns pass through untouched.
    pub fn validate(&self, df: &DataFrame) -> Result<DataFrame, LoaderError> {
        for name in [self.id.as_str(), self.class.as_str()]
            .into_iter()
            .chain(self.numeric_columns())
        {
            if df.column(name).is_err() {
                return Err(LoaderError::Schema(format!(
                    "required column '{name}' is missing"
                )));
            }
        }

        for name in self.numeric_columns() {
            let dtype = df.column(name)?.dtype();
            // An all-empty column is read as Null and casts cleanly
            if !is_numeric(dtype) && dtype != &DataType::Null {
                return Err(LoaderError::Schema(format!(
                    "column '{name}' must be numeric, found {dtype}"
                )));
            }
        }

        let mut out = df.clone();
        let casts = [
            (self.year.as_str(), DataType::Int64),
            (self.mass.as_str(), DataType::Float64),
            (self.latitude.as_str(), DataType::Float64),
            (self.longitude.as_str(), DataType::Float64),
            (self.class.as_str(), DataType::String),
        ];
        for (name, dtype) in casts {
            let cast = out.column(name)?.cast(&dtype)?;
            out.with_column(cast)?;
        }

        Ok(out)
    }

    /// Read typed records from a validated table.
    pub fn records(&self, df: &DataFrame) -> Result<Vec<LandingRecord>, LoaderError> {
        let ids = df.column(&self.id)?.cast(&DataType::String)?;
        let ids = ids.str()?;
        let classes = df.column(&self.class)?.cast(&DataType::String)?;
        let classes = classes.str()?;
        let masses = df.column(&self.mass)?.cast(&DataType::Float64)?;
        let masses = masses.f64()?;
        let lats = df.column(&self.latitude)?.cast(&DataType::Float64)?;
        let lats = lats.f64()?;
        let lons = df.column(&self.longitude)?.cast(&DataType::Float64)?;
        let lons = lons.f64()?;
        let years = df.column(&self.year)?.cast(&DataType::Int64)?;
        let years = years.i64()?;

        let records = (0..df.height())
            .map(|i| LandingRecord {
                id: ids.get(i).unwrap_or_default().to_string(),
                class: classes.get(i).map(str::to_string),
                mass: masses.get(i),
                latitude: lats.get(i),
                longitude: lons.get(i),
                year: years.get(i),
            })
            .collect();

        Ok(records)
    }

    /// Latitude and longitude of every row, `None` where either is missing or not finite.
    pub fn points(&self, df: &DataFrame) -> Result<Vec<Option<(f64, f64)>>, LoaderError> {
        let lats = df.column(&self.latitude)?.cast(&DataType::Float64)?;
        let lons = df.column(&self.longitude)?.cast(&DataType::Float64)?;

        let points = lats
            .f64()?
            .into_iter()
            .zip(lons.f64()?.into_iter())
            .map(|(lat, lon)| match (lat, lon) {
                (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
                _ => None,
            })
            .collect();

        Ok(points)
    }
}
