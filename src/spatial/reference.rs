//! Reference Polygon Module
//! Country and continent boundaries with an R-tree over their bounding boxes.

use super::GeoError;
use geo::{BoundingRect, Coord, Intersects, LineString, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, Value};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// GeoJSON feature properties carrying the labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceProperties {
    pub country: String,
    pub continent: String,
}

impl Default for ReferenceProperties {
    fn default() -> Self {
        Self {
            country: "name".to_string(),
            continent: "continent".to_string(),
        }
    }
}

/// One country boundary with its labels.
#[derive(Debug, Clone)]
pub struct CountryPolygon {
    pub country: String,
    pub continent: String,
    pub geometry: MultiPolygon<f64>,
}

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Immutable polygon set with a spatial index.
///
/// Polygon order is the order of the source; lookups report indices in that order.
pub struct ReferenceSet {
    polygons: Vec<CountryPolygon>,
    tree: RTree<IndexedBox>,
}

impl ReferenceSet {
    pub fn new(polygons: Vec<CountryPolygon>) -> Self {
        let boxes: Vec<IndexedBox> = polygons
            .iter()
            .enumerate()
            .filter_map(|(i, polygon)| {
                let rect = polygon.geometry.bounding_rect()?;
                let (min, max) = (rect.min(), rect.max());
                Some(GeomWithData::new(
                    Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                    i,
                ))
            })
            .collect();

        Self {
            polygons,
            tree: RTree::bulk_load(boxes),
        }
    }

    /// Load a GeoJSON FeatureCollection from disk.
    pub fn load(path: &Path, properties: &ReferenceProperties) -> Result<Self, GeoError> {
        let text = std::fs::read_to_string(path).map_err(|source| GeoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_geojson_str(&text, properties)?;
        info!(
            path = %path.display(),
            polygons = set.len(),
            "loaded reference polygons"
        );
        Ok(set)
    }

    /// Parse a GeoJSON FeatureCollection of Polygon or MultiPolygon features.
    ///
    /// Features with another geometry type or without both label properties are skipped.
    pub fn from_geojson_str(text: &str, properties: &ReferenceProperties) -> Result<Self, GeoError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| GeoError::Parse(e.to_string()))?;

        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(GeoError::Parse(
                "reference data must be a FeatureCollection".to_string(),
            ));
        };

        let mut polygons = Vec::with_capacity(collection.features.len());
        for (i, feature) in collection.features.into_iter().enumerate() {
            let label = |key: &str| {
                feature
                    .property(key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            let (Some(country), Some(continent)) =
                (label(&properties.country), label(&properties.continent))
            else {
                debug!(feature = i, "skipping feature without labels");
                continue;
            };

            let geometry = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(Value::Polygon(rings)) => MultiPolygon::new(vec![polygon_from_rings(rings)]),
                Some(Value::MultiPolygon(parts)) => {
                    MultiPolygon::new(parts.iter().map(|rings| polygon_from_rings(rings)).collect())
                }
                _ => {
                    debug!(feature = i, %country, "skipping non-polygon feature");
                    continue;
                }
            };

            polygons.push(CountryPolygon {
                country,
                continent,
                geometry,
            });
        }

        if polygons.is_empty() {
            return Err(GeoError::EmptyInput(
                "reference data has no labelled polygons".to_string(),
            ));
        }

        Ok(Self::new(polygons))
    }

    /// Indices of every polygon whose area or boundary contains `(lon, lat)`,
    /// in ascending source order.
    pub fn locate(&self, lon: f64, lat: f64) -> Vec<usize> {
        let point = Point::new(lon, lat);
        let mut hits: Vec<usize> = self
            .tree
            .locate_all_at_point(&[lon, lat])
            .map(|entry| entry.data)
            .filter(|&i| self.polygons[i].geometry.intersects(&point))
            .collect();
        hits.sort_unstable();
        hits
    }

    pub fn get(&self, index: usize) -> Option<&CountryPolygon> {
        self.polygons.get(index)
    }

    pub fn polygons(&self) -> &[CountryPolygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

fn ring(positions: &[Vec<f64>]) -> LineString<f64> {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect()
}

/// First ring is the exterior, the rest are holes.
fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    let mut rings = rings.iter();
    let exterior = rings.next().map(|r| ring(r)).unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = rings.map(|r| ring(r)).collect();
    Polygon::new(exterior, interiors)
}
