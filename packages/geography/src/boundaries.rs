//! Pre-loaded state boundary polygons.
//!
//! State outlines are read once at startup from a `GeoJSON`
//! `FeatureCollection` (for example the Census cartographic boundary
//! file) and indexed by two-digit FIPS code.

use std::collections::BTreeMap;
use std::path::Path;

use ej_api_geography_models::normalize_code;
use geojson::{Feature, GeoJson};

use crate::GeoError;

/// Property names that may carry a state's FIPS code, in lookup order.
pub const STATE_ID_COLUMNS: &[&str] = &["STATEFP", "STATE_FIPS", "GEOID", "FIPS"];

/// State boundary features keyed by FIPS code.
#[derive(Debug, Default)]
pub struct StateBoundaries {
    by_fips: BTreeMap<String, Feature>,
}

impl StateBoundaries {
    /// Creates an empty collection. Every lookup against it misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads boundaries from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be read or is not a
    /// `FeatureCollection`.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let text = std::fs::read_to_string(path)?;
        let boundaries = Self::from_geojson(&text)?;
        log::info!(
            "Loaded {} state boundaries from {}",
            boundaries.len(),
            path.display()
        );
        Ok(boundaries)
    }

    /// Parses boundaries from `GeoJSON` text.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the text is not a `FeatureCollection`.
    pub fn from_geojson(text: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(GeoError::Conversion {
                message: "State boundaries must be a GeoJSON FeatureCollection".to_string(),
            });
        };

        Ok(Self::from_features(collection.features))
    }

    /// Indexes boundary features by FIPS code.
    ///
    /// Features without a recognizable FIPS property are skipped.
    #[must_use]
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut by_fips = BTreeMap::new();
        for feature in features {
            let Some(code) = feature_code(&feature, STATE_ID_COLUMNS) else {
                log::warn!("Skipping state boundary without a FIPS property");
                continue;
            };
            by_fips.insert(code, feature);
        }

        Self { by_fips }
    }

    /// Returns the boundary feature for a state FIPS code.
    #[must_use]
    pub fn get(&self, fips: &str) -> Option<&Feature> {
        self.by_fips.get(fips)
    }

    /// Number of loaded states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_fips.len()
    }

    /// Returns `true` if nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_fips.is_empty()
    }
}

/// Reads the first present property among `columns` as a normalized code.
///
/// Numeric properties are accepted as well as strings.
#[must_use]
pub fn feature_code(feature: &Feature, columns: &[&str]) -> Option<String> {
    columns.iter().find_map(|column| {
        match feature.property(column)? {
            serde_json::Value::String(s) => Some(normalize_code(s)),
            serde_json::Value::Number(n) => Some(normalize_code(&n.to_string())),
            _ => None,
        }
        .filter(|code| !code.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "STATEFP": "06", "NAME": "California" },
                "geometry": { "type": "Polygon", "coordinates": [[[-124, 32], [-114, 32], [-114, 42], [-124, 42], [-124, 32]]] }
            },
            {
                "type": "Feature",
                "properties": { "GEOID": 36 },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Nowhere" },
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn indexes_features_by_fips() {
        let boundaries = StateBoundaries::from_geojson(STATES).unwrap();
        assert_eq!(boundaries.len(), 2);
        assert!(boundaries.get("06").is_some());
        assert!(boundaries.get("36").is_some());
        assert!(boundaries.get("12").is_none());
    }

    #[test]
    fn numeric_codes_are_normalized() {
        let feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(
                serde_json::json!({ "GEOID": 6 })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            foreign_members: None,
        };
        assert_eq!(feature_code(&feature, STATE_ID_COLUMNS), Some("06".into()));
    }

    #[test]
    fn rejects_non_collections() {
        let err = StateBoundaries::from_geojson(r#"{"type":"Point","coordinates":[0,0]}"#);
        assert!(err.is_err());
    }
}
