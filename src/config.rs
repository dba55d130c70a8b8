//! Settings
//! Input paths, column names and chart parameters, read from an optional JSON file.

use crate::data::LandingSchema;
use crate::spatial::{JoinPolicy, ReferenceProperties};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Year windows, limits and highlighted labels used by the dashboard views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Inclusive year window for yearly counts and per-continent running totals.
    pub landing_years: (i64, i64),
    /// Inclusive year window for the yearly average mass.
    pub mass_years: (i64, i64),
    pub top_countries: usize,
    pub top_classes: usize,
    pub heaviest_classes: usize,
    /// Country left out of the per-country chart.
    pub excluded_country: Option<String>,
    /// Continent whose share is reported on its own.
    pub highlighted_continent: String,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            landing_years: (1970, 2013),
            mass_years: (1980, 2013),
            top_countries: 10,
            top_classes: 15,
            heaviest_classes: 20,
            excluded_country: Some("Antarctica".to_string()),
            highlighted_continent: "Antarctica".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub landings: Vec<PathBuf>,
    pub reference: PathBuf,
    pub schema: LandingSchema,
    pub reference_properties: ReferenceProperties,
    pub join_policy: JoinPolicy,
    pub views: ViewSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            landings: vec![PathBuf::from("Meteorite_Landings.csv")],
            reference: PathBuf::from("data/naturalearth_lowres.geojson"),
            schema: LandingSchema::default(),
            reference_properties: ReferenceProperties::default(),
            join_policy: JoinPolicy::default(),
            views: ViewSettings::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
