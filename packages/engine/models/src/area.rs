//! The area an analysis runs over.
//!
//! Requests carry exactly one of site points, a shape, or a geography
//! code. [`AreaSpecification`] is built once at the HTTP boundary so the
//! rest of the pipeline matches on a single tagged value instead of
//! re-checking which optional parameter was filled in.

use std::str::FromStr as _;

use geojson::{Feature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::InputMethod;

/// Errors raised while turning request input into an analysis area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    /// None of points, shape, or code was supplied.
    #[error("You must provide valid points, a shape, or a FIPS code.")]
    Missing,

    /// More than one of points, shape, or code was supplied.
    #[error("Provide only one of points, a shape, or a FIPS code.")]
    Ambiguous,

    /// Buffer radius was non-numeric or out of range.
    #[error("Buffer must be a number of miles between 0 and 15.")]
    InvalidBuffer,

    /// Input method name is not one of `latlon`, `SHP`, `FIPS`.
    #[error("Unsupported input method: {method}")]
    UnsupportedMethod {
        /// The method that was asked for.
        method: String,
    },

    /// Input did not have the structure its method requires.
    #[error("{message}")]
    InvalidInput {
        /// Description of what was wrong.
        message: String,
    },

    /// Shape text could not be parsed as `GeoJSON`.
    #[error("Invalid GeoJSON provided.")]
    InvalidGeoJson,
}

/// A single site location in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SitePoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// The area a request asks to analyze.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaSpecification {
    /// Site points, in request order.
    Points(Vec<SitePoint>),
    /// Submitted shapes, one feature per site.
    Shape(FeatureCollection),
    /// A geography code or place name.
    GeographyCode(String),
}

impl AreaSpecification {
    /// Builds the area from the three mutually exclusive request inputs.
    ///
    /// `null` and blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::Missing`] if nothing was supplied,
    /// [`AreaError::Ambiguous`] if more than one input was supplied, or
    /// the parse error of the supplied input.
    pub fn from_inputs(
        sites: Option<&Value>,
        shape: Option<&str>,
        fips: Option<&str>,
    ) -> Result<Self, AreaError> {
        let sites = sites.filter(|v| !v.is_null());
        let shape = shape.map(str::trim).filter(|s| !s.is_empty());
        let fips = fips.map(str::trim).filter(|s| !s.is_empty());

        match (sites, shape, fips) {
            (Some(sites), None, None) => parse_sites(sites).map(Self::Points),
            (None, Some(shape), None) => parse_shape(shape).map(Self::Shape),
            (None, None, Some(code)) => Ok(Self::GeographyCode(code.to_string())),
            (None, None, None) => Err(AreaError::Missing),
            _ => Err(AreaError::Ambiguous),
        }
    }

    /// Builds the area from an explicit method name and its raw input.
    ///
    /// # Errors
    ///
    /// Returns [`AreaError::UnsupportedMethod`] for unknown methods, or the
    /// parse error of the input for the named method.
    pub fn from_method(method: &str, area: &Value) -> Result<Self, AreaError> {
        let method = InputMethod::from_str(method).map_err(|_| AreaError::UnsupportedMethod {
            method: method.to_string(),
        })?;

        match method {
            InputMethod::Latlon => parse_sites(area).map(Self::Points),
            InputMethod::Shp => match area {
                Value::String(text) => parse_shape(text),
                other => parse_shape_value(other.clone()),
            }
            .map(Self::Shape),
            InputMethod::Fips => match area {
                Value::String(code) if !code.trim().is_empty() => {
                    Ok(Self::GeographyCode(code.trim().to_string()))
                }
                Value::Number(n) => Ok(Self::GeographyCode(n.to_string())),
                _ => Err(AreaError::InvalidInput {
                    message: "FIPS input must be a code or place name.".to_string(),
                }),
            },
        }
    }

    /// The input method of this area.
    #[must_use]
    pub const fn method(&self) -> InputMethod {
        match self {
            Self::Points(_) => InputMethod::Latlon,
            Self::Shape(_) => InputMethod::Shp,
            Self::GeographyCode(_) => InputMethod::Fips,
        }
    }
}

fn invalid_sites(message: &str) -> AreaError {
    AreaError::InvalidInput {
        message: message.to_string(),
    }
}

/// Parses a coordinate table.
///
/// Accepts rows (`[{"lat": .., "lon": ..}, ..]`) or columns
/// (`{"lat": [..], "lon": [..]}`). `latitude`/`longitude`/`lng` are
/// accepted as column names and numeric strings as values.
///
/// # Errors
///
/// Returns [`AreaError::InvalidInput`] if the value is not a non-empty
/// coordinate table or a coordinate is out of range.
pub fn parse_sites(value: &Value) -> Result<Vec<SitePoint>, AreaError> {
    let points = match value {
        Value::Array(rows) => rows
            .iter()
            .map(|row| {
                let row = row
                    .as_object()
                    .ok_or_else(|| invalid_sites("Each site must be an object with lat and lon."))?;
                let lat = coordinate(row, &["lat", "latitude"])?;
                let lon = coordinate(row, &["lon", "lng", "longitude"])?;
                Ok(SitePoint { lat, lon })
            })
            .collect::<Result<Vec<_>, AreaError>>()?,
        Value::Object(table) => {
            let lats = column(table, &["lat", "latitude"])?;
            let lons = column(table, &["lon", "lng", "longitude"])?;
            if lats.len() != lons.len() {
                return Err(invalid_sites("lat and lon columns must have the same length."));
            }
            lats.into_iter()
                .zip(lons)
                .map(|(lat, lon)| SitePoint { lat, lon })
                .collect()
        }
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|_| invalid_sites("Sites must be a table of lat/lon coordinates."))?;
            if parsed.is_string() {
                return Err(invalid_sites("Sites must be a table of lat/lon coordinates."));
            }
            return parse_sites(&parsed);
        }
        _ => return Err(invalid_sites("Sites must be a table of lat/lon coordinates.")),
    };

    if points.is_empty() {
        return Err(invalid_sites("At least one site is required."));
    }
    for point in &points {
        if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
            return Err(AreaError::InvalidInput {
                message: format!(
                    "Coordinates out of range: lat {}, lon {}",
                    point.lat, point.lon
                ),
            });
        }
    }

    Ok(points)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

fn coordinate(row: &serde_json::Map<String, Value>, names: &[&str]) -> Result<f64, AreaError> {
    names
        .iter()
        .find_map(|name| row.get(*name))
        .and_then(number)
        .ok_or_else(|| invalid_sites("Each site must have numeric lat and lon values."))
}

fn column(table: &serde_json::Map<String, Value>, names: &[&str]) -> Result<Vec<f64>, AreaError> {
    let values = names
        .iter()
        .find_map(|name| table.get(*name))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid_sites("Sites must be a table of lat/lon coordinates."))?;

    values
        .iter()
        .map(|v| {
            number(v)
                .ok_or_else(|| invalid_sites("Each site must have numeric lat and lon values."))
        })
        .collect()
}

/// Parses encoded `GeoJSON` text into one feature per site.
///
/// A bare geometry or a single feature becomes a one-feature collection.
///
/// # Errors
///
/// Returns [`AreaError::InvalidGeoJson`] if the text is not `GeoJSON` or
/// contains no features.
pub fn parse_shape(text: &str) -> Result<FeatureCollection, AreaError> {
    let value: Value = serde_json::from_str(text).map_err(|_| AreaError::InvalidGeoJson)?;
    parse_shape_value(value)
}

fn parse_shape_value(value: Value) -> Result<FeatureCollection, AreaError> {
    let geojson = GeoJson::from_json_value(value).map_err(|_| AreaError::InvalidGeoJson)?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    if features.is_empty() {
        return Err(AreaError::InvalidGeoJson);
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const POLYGON: &str = r#"{"type":"Polygon","coordinates":[[[-122.5,37.7],[-122.3,37.7],[-122.3,37.8],[-122.5,37.8],[-122.5,37.7]]]}"#;

    #[test]
    fn exactly_one_input_is_required() {
        assert_eq!(
            AreaSpecification::from_inputs(None, None, None),
            Err(AreaError::Missing)
        );
        assert_eq!(
            AreaSpecification::from_inputs(Some(&Value::Null), Some("  "), Some("")),
            Err(AreaError::Missing)
        );
        assert_eq!(
            AreaSpecification::from_inputs(None, Some(POLYGON), Some("06")),
            Err(AreaError::Ambiguous)
        );
    }

    #[test]
    fn builds_each_variant() {
        let sites = json!([{ "lat": 37.77, "lon": -122.42 }]);
        let area = AreaSpecification::from_inputs(Some(&sites), None, None).unwrap();
        assert_eq!(area.method(), InputMethod::Latlon);

        let area = AreaSpecification::from_inputs(None, Some(POLYGON), None).unwrap();
        assert_eq!(area.method(), InputMethod::Shp);

        let area = AreaSpecification::from_inputs(None, None, Some(" 06075 ")).unwrap();
        assert_eq!(area, AreaSpecification::GeographyCode("06075".into()));
    }

    #[test]
    fn parses_row_and_column_tables() {
        let rows = json!([
            { "lat": 37.77, "lon": -122.42 },
            { "latitude": "40.71", "longitude": "-74.0" }
        ]);
        let points = parse_sites(&rows).unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[1].lat - 40.71).abs() < 1e-9);

        let columns = json!({ "lat": [37.77, 40.71], "lng": [-122.42, -74.0] });
        assert_eq!(
            parse_sites(&columns).unwrap(),
            points_from(&[(37.77, -122.42), (40.71, -74.0)])
        );
    }

    fn points_from(pairs: &[(f64, f64)]) -> Vec<SitePoint> {
        pairs.iter().map(|&(lat, lon)| SitePoint { lat, lon }).collect()
    }

    #[test]
    fn rejects_non_tabular_sites() {
        for value in [json!("06075"), json!(42), json!([]), json!([1, 2]), json!([{ "lat": 1 }])] {
            assert!(
                matches!(parse_sites(&value), Err(AreaError::InvalidInput { .. })),
                "accepted {value}"
            );
        }
        assert!(parse_sites(&json!({ "lat": [1.0], "lon": [] })).is_err());
        assert!(parse_sites(&json!([{ "lat": 91, "lon": 0 }])).is_err());
    }

    #[test]
    fn sites_may_arrive_as_json_text() {
        let text = json!(r#"[{"lat": 37.77, "lon": -122.42}]"#);
        assert_eq!(parse_sites(&text).unwrap().len(), 1);
    }

    #[test]
    fn malformed_geojson_is_rejected() {
        assert_eq!(parse_shape("{not valid json"), Err(AreaError::InvalidGeoJson));
        assert_eq!(parse_shape(r#"{"type":"Blob"}"#), Err(AreaError::InvalidGeoJson));
        assert_eq!(
            parse_shape(r#"{"type":"FeatureCollection","features":[]}"#),
            Err(AreaError::InvalidGeoJson)
        );
        assert_eq!(
            AreaError::InvalidGeoJson.to_string(),
            "Invalid GeoJSON provided."
        );
    }

    #[test]
    fn geometry_becomes_single_feature() {
        let collection = parse_shape(POLYGON).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert!(collection.features[0].geometry.is_some());
    }

    #[test]
    fn method_names_are_checked() {
        assert_eq!(
            AreaSpecification::from_method("address", &json!("1 Main St")),
            Err(AreaError::UnsupportedMethod {
                method: "address".into()
            })
        );
        assert_eq!(
            AreaSpecification::from_method("SHP", &json!("{not valid json")),
            Err(AreaError::InvalidGeoJson)
        );
        assert!(matches!(
            AreaSpecification::from_method("latlon", &json!("06075")),
            Err(AreaError::InvalidInput { .. })
        ));
        assert_eq!(
            AreaSpecification::from_method("FIPS", &json!("06")),
            Ok(AreaSpecification::GeographyCode("06".into()))
        );
    }
}
