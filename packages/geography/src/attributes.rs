//! Display attributes for county and state boundary overlays.
//!
//! A raw boundary feature goes through four steps: its identifier column
//! is renamed to `FIPS`, columns outside the standard set are dropped,
//! derived display columns are attached, and the columns are put in
//! canonical order. Each derived column is computed on its own; a lookup
//! that fails leaves that column `null` and the rest are still filled in.

use ej_api_geography_models::{Granularity, columns, fips, normalize_code};
use geo::GeodesicArea as _;
use geojson::{Feature, JsonObject};
use serde_json::Value;

use crate::GeographyLookup;

const SQ_METERS_PER_SQ_MILE: f64 = 2_589_988.110_336;

/// Standardizes a boundary feature for display.
///
/// `id_column` names the property that holds the code in the raw feature.
/// When `fips_override` is given it replaces whatever code the feature
/// carried (or supplies one if it had none).
#[must_use]
pub fn standardize(
    mut feature: Feature,
    id_column: &str,
    fips_override: Option<&str>,
    lookup: &dyn GeographyLookup,
) -> Feature {
    let mut properties = feature.properties.take().unwrap_or_default();

    rename_id_column(&mut properties, id_column);
    if let Some(code) = fips_override {
        properties.insert(columns::FIPS.to_string(), Value::String(code.to_string()));
    }
    strip_nonstandard(&mut properties);
    attach_attributes(&mut properties, feature.geometry.as_ref(), lookup);

    feature.properties = Some(canonical_order(properties));
    feature
}

/// Moves `id_column` to `FIPS` as a normalized string code.
fn rename_id_column(properties: &mut JsonObject, id_column: &str) {
    if let Some(value) = properties.remove(id_column) {
        let value = match value {
            Value::String(s) => Value::String(normalize_code(&s)),
            Value::Number(n) => Value::String(normalize_code(&n.to_string())),
            other => other,
        };
        properties.insert(columns::FIPS.to_string(), value);
    }
}

fn strip_nonstandard(properties: &mut JsonObject) {
    properties.retain(|key, _| columns::CANONICAL.contains(&key.as_str()));
}

#[allow(clippy::cast_precision_loss)]
fn attach_attributes(
    properties: &mut JsonObject,
    geometry: Option<&geojson::Geometry>,
    lookup: &dyn GeographyLookup,
) {
    let code = properties
        .get(columns::FIPS)
        .and_then(Value::as_str)
        .map(str::to_string);
    let code = code.as_deref();

    let population = code.and_then(|c| population(c, lookup));
    let sq_mi = code.and_then(|c| area_sq_mi(c, geometry, lookup));
    let density = match (population, sq_mi) {
        (Some(pop), Some(area)) if area > 0.0 => Some(pop as f64 / area),
        _ => None,
    };

    set_column(
        properties,
        columns::NAME,
        code.and_then(|c| display_name(c, lookup)).map(Value::from),
    );
    set_column(
        properties,
        columns::FIPS_TYPE,
        code.map(|c| Value::from(Granularity::classify(c).to_string())),
    );
    set_column(
        properties,
        columns::STATE_ABBR,
        code.and_then(fips::containing_state).map(|s| Value::from(s.abbr)),
    );
    set_column(
        properties,
        columns::STATE_NAME,
        code.and_then(fips::containing_state).map(|s| Value::from(s.name)),
    );
    set_column(properties, columns::POP, population.map(Value::from));
    set_column(properties, columns::SQMI, sq_mi.map(Value::from));
    set_column(properties, columns::POP_SQMI, density.map(Value::from));
}

/// Writes a derived value. When derivation failed, a value the source
/// already supplied for a standard column is kept, otherwise `null`.
fn set_column(properties: &mut JsonObject, column: &str, value: Option<Value>) {
    match value {
        Some(v) => {
            properties.insert(column.to_string(), v);
        }
        None => {
            let existing = properties.get(column).filter(|v| !v.is_null()).cloned();
            if existing.is_none() {
                log::debug!("No value for overlay column {column}; leaving it null");
            }
            properties.insert(column.to_string(), existing.unwrap_or(Value::Null));
        }
    }
}

fn display_name(code: &str, lookup: &dyn GeographyLookup) -> Option<String> {
    lookup
        .record(code)
        .map(|r| r.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| {
            (Granularity::classify(code) == Granularity::State)
                .then(|| fips::by_fips(code).map(|s| s.name.to_string()))
                .flatten()
        })
}

fn population(code: &str, lookup: &dyn GeographyLookup) -> Option<u64> {
    lookup.record(code).and_then(|r| r.population)
}

fn area_sq_mi(
    code: &str,
    geometry: Option<&geojson::Geometry>,
    lookup: &dyn GeographyLookup,
) -> Option<f64> {
    geometry
        .and_then(geodesic_area_sq_mi)
        .or_else(|| lookup.record(code).and_then(|r| r.area_sq_mi))
}

fn geodesic_area_sq_mi(geometry: &geojson::Geometry) -> Option<f64> {
    let geometry = geo::Geometry::<f64>::try_from(geometry.clone()).ok()?;
    let sq_m = match geometry {
        geo::Geometry::Polygon(p) => p.geodesic_area_unsigned(),
        geo::Geometry::MultiPolygon(mp) => mp.geodesic_area_unsigned(),
        _ => return None,
    };
    (sq_m > 0.0).then_some(sq_m / SQ_METERS_PER_SQ_MILE)
}

/// Rebuilds the property map with canonical columns first, in order.
fn canonical_order(mut properties: JsonObject) -> JsonObject {
    let mut ordered = JsonObject::new();
    for column in columns::CANONICAL {
        if let Some(value) = properties.remove(*column) {
            ordered.insert((*column).to_string(), value);
        }
    }
    ordered.extend(properties);
    ordered
}
