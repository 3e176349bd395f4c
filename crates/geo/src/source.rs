use std::path::{Path, PathBuf};

use log::debug;

use geosync_core::PointXY;

use crate::error::GeoError;
use crate::geometry::{Crs, Polygon};

/// Provides the single reference polygon used for region filtering.
///
/// Lookup is strict on purpose: zero candidates or more than one candidate
/// with the configured identifier is a configuration error, never a silent
/// "first match wins" — that would make region filtering depend on file
/// ordering and differ across environments.
pub trait PolygonSource {
    fn get(&self, polygon_id: &str) -> Result<Polygon, GeoError>;
}

/// Polygon source backed by a GeoJSON file (a `FeatureCollection` or a
/// single `Feature`). Features are identified by a configured property.
pub struct GeoJsonPolygonSource {
    path: PathBuf,
    id_property: String,
    crs: Crs,
}

impl GeoJsonPolygonSource {
    pub fn new(path: impl Into<PathBuf>, id_property: impl Into<String>, crs: Crs) -> Self {
        GeoJsonPolygonSource {
            path: path.into(),
            id_property: id_property.into(),
            crs,
        }
    }
}

impl PolygonSource for GeoJsonPolygonSource {
    fn get(&self, polygon_id: &str) -> Result<Polygon, GeoError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| GeoError::Io(format!("{}: {e}", self.path.display())))?;
        let doc: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| GeoError::Parse(e.to_string()))?;

        let features = collect_features(&doc);
        if features.is_empty() {
            return Err(GeoError::Configuration(format!(
                "no polygon found at {}",
                self.path.display()
            )));
        }

        // A single-feature file is the polygon; with several features the
        // configured identifier must select exactly one.
        let feature = if features.len() == 1 {
            features[0]
        } else {
            let matches: Vec<&serde_json::Value> = features
                .iter()
                .filter(|f| feature_id_matches(f, &self.id_property, polygon_id))
                .copied()
                .collect();
            if matches.len() != 1 {
                return Err(GeoError::Configuration(format!(
                    "{} polygons with the value {polygon_id} in property {} found in {}",
                    matches.len(),
                    self.id_property,
                    self.path.display()
                )));
            }
            matches[0]
        };

        debug!("polygon {polygon_id} loaded from {}", self.path.display());
        parse_polygon_geometry(feature, self.crs, &self.path)
    }
}

fn collect_features(doc: &serde_json::Value) -> Vec<&serde_json::Value> {
    match doc.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => doc
            .get("features")
            .and_then(|f| f.as_array())
            .map(|a| a.iter().collect())
            .unwrap_or_default(),
        Some("Feature") => vec![doc],
        _ => Vec::new(),
    }
}

fn feature_id_matches(feature: &serde_json::Value, property: &str, id: &str) -> bool {
    let Some(value) = feature.get("properties").and_then(|p| p.get(property)) else {
        return false;
    };
    match value {
        serde_json::Value::String(s) => s == id,
        serde_json::Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

fn parse_polygon_geometry(
    feature: &serde_json::Value,
    crs: Crs,
    path: &Path,
) -> Result<Polygon, GeoError> {
    let geometry = feature
        .get("geometry")
        .ok_or_else(|| GeoError::Parse(format!("feature without geometry in {}", path.display())))?;

    let geom_type = geometry.get("type").and_then(|t| t.as_str()).unwrap_or("");
    if geom_type != "Polygon" {
        return Err(GeoError::Configuration(format!(
            "unsupported geometry type '{geom_type}' in {}, expected Polygon",
            path.display()
        )));
    }

    let rings = geometry
        .get("coordinates")
        .and_then(|c| c.as_array())
        .ok_or_else(|| GeoError::Parse("polygon without coordinates".into()))?;

    let mut parsed: Vec<Vec<PointXY>> = Vec::with_capacity(rings.len());
    for ring in rings {
        let positions = ring
            .as_array()
            .ok_or_else(|| GeoError::Parse("polygon ring is not an array".into()))?;
        let mut points = Vec::with_capacity(positions.len());
        for pos in positions {
            let coords = pos
                .as_array()
                .ok_or_else(|| GeoError::Parse("position is not an array".into()))?;
            let (Some(x), Some(y)) = (
                coords.first().and_then(|v| v.as_f64()),
                coords.get(1).and_then(|v| v.as_f64()),
            ) else {
                return Err(GeoError::Parse("position without two coordinates".into()));
            };
            points.push(PointXY::new(x, y));
        }
        parsed.push(points);
    }

    if parsed.is_empty() {
        return Err(GeoError::Parse("polygon without rings".into()));
    }

    let exterior = parsed.remove(0);
    Ok(Polygon::new(exterior, parsed, crs))
}
