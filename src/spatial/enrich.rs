//! Geo-Enrichment Module
//! Inner spatial join of landing points against the reference polygons.

use super::{GeoError, ReferenceSet};
use crate::data::LandingSchema;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const COUNTRY_COLUMN: &str = "Country Name";
pub const CONTINENT_COLUMN: &str = "Continent Name";

/// What to do when a landing lies in more than one polygon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Keep the polygon listed first in the reference data.
    #[default]
    First,
    /// Fail the whole join.
    Reject,
}

/// Attach country and continent labels to every landing inside a reference polygon.
///
/// Rows with a missing coordinate or outside every polygon are dropped. Each kept
/// row appears once, in input order. Fails with [`GeoError::EmptyInput`] when no
/// row survives.
pub fn enrich(
    df: &DataFrame,
    reference: &ReferenceSet,
    schema: &LandingSchema,
    policy: JoinPolicy,
) -> Result<DataFrame, GeoError> {
    let points = schema
        .points(df)
        .map_err(|e| GeoError::Schema(e.to_string()))?;

    let matches: Vec<Option<usize>> = points
        .par_iter()
        .enumerate()
        .map(|(row, point)| {
            let Some((lat, lon)) = *point else {
                return Ok(None);
            };
            let hits = reference.locate(lon, lat);
            match (hits.as_slice(), policy) {
                ([], _) => Ok(None),
                ([only], _) => Ok(Some(*only)),
                ([first, ..], JoinPolicy::First) => {
                    warn!(row, candidates = hits.len(), "landing on a shared border");
                    Ok(Some(*first))
                }
                (_, JoinPolicy::Reject) => Err(GeoError::JoinAmbiguity {
                    row,
                    countries: hits
                        .iter()
                        .filter_map(|&i| reference.get(i))
                        .map(|p| p.country.clone())
                        .collect(),
                }),
            }
        })
        .collect::<Result<_, GeoError>>()?;

    let mask: BooleanChunked = matches.iter().map(|m| Some(m.is_some())).collect();
    let (countries, continents): (Vec<&str>, Vec<&str>) = matches
        .iter()
        .flatten()
        .filter_map(|&i| reference.get(i))
        .map(|p| (p.country.as_str(), p.continent.as_str()))
        .unzip();

    let missing = points.iter().filter(|p| p.is_none()).count();
    info!(
        rows = df.height(),
        kept = countries.len(),
        missing_coordinates = missing,
        outside = df.height() - countries.len() - missing,
        "enriched landings"
    );

    if countries.is_empty() {
        return Err(GeoError::EmptyInput(
            "no landing falls inside a reference polygon".to_string(),
        ));
    }

    let mut out = df.filter(&mask)?;
    out.with_column(Column::new(COUNTRY_COLUMN.into(), countries))?;
    out.with_column(Column::new(CONTINENT_COLUMN.into(), continents))?;
    Ok(out)
}
