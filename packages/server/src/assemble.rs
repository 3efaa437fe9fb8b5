//! Response assembly for the data and report endpoints.
//!
//! The data endpoint returns the engine's per-site rows, optionally with
//! a `geometry` per row. The report endpoint builds the map overlay that
//! goes to the report renderer alongside the result.

use ej_api_engine_models::{AnalysisResult, EngineRequest};
use ej_api_geography::{
    attributes::standardize,
    boundaries::STATE_ID_COLUMNS,
    buffer::site_geometry,
    feature_service::{fetch_county, select_feature},
};
use ej_api_geography_models::{Granularity, columns};
use geojson::{Feature, FeatureCollection, Geometry};
use serde_json::Value;
use thiserror::Error;

use crate::AppState;

/// Property holding the site identifier on report overlay features.
pub const SITE_ID_PROPERTY: &str = "ejam_uniq_id";

/// Errors joining engine rows with geometry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    /// Row and geometry counts differ.
    #[error("Result has {rows} rows but {geometries} geometries")]
    RowCountMismatch {
        /// Result rows returned by the engine.
        rows: usize,
        /// Geometries built from the request.
        geometries: usize,
    },
}

/// Builds the data endpoint payload.
///
/// Without `geometries` the rows are returned untouched. With them, row
/// `i` gains a `geometry` key holding geometry `i` (or `null`).
///
/// # Errors
///
/// Returns [`AssembleError::RowCountMismatch`] if the counts differ.
pub fn data_rows(
    result: AnalysisResult,
    geometries: Option<Vec<Option<Geometry>>>,
) -> Result<Value, AssembleError> {
    let rows = result.results_bysite;

    let Some(geometries) = geometries else {
        return Ok(Value::Array(rows.into_iter().map(Value::Object).collect()));
    };

    if rows.len() != geometries.len() {
        return Err(AssembleError::RowCountMismatch {
            rows: rows.len(),
            geometries: geometries.len(),
        });
    }

    Ok(Value::Array(
        rows.into_iter()
            .zip(geometries)
            .map(|(mut row, geometry)| {
                let geometry = geometry
                    .and_then(|g| serde_json::to_value(g).ok())
                    .unwrap_or(Value::Null);
                row.insert("geometry".to_string(), geometry);
                Value::Object(row)
            })
            .collect(),
    ))
}

/// Builds one geometry per site for the data endpoint, in site order.
pub async fn data_geometries(state: &AppState, request: &EngineRequest) -> Vec<Option<Geometry>> {
    match request {
        EngineRequest::Points { sitepoints, radius } => sitepoints
            .iter()
            .map(|p| Some(site_geometry(p.lat, p.lon, *radius)))
            .collect(),
        EngineRequest::Shape { shapefile, .. } => shapefile
            .features
            .iter()
            .map(|f| f.geometry.clone())
            .collect(),
        EngineRequest::Fips { fips, .. } => {
            let mut geometries = Vec::with_capacity(fips.len());
            for code in fips {
                let geometry = raw_boundary(state, code)
                    .await
                    .and_then(|(feature, _)| feature.geometry);
                geometries.push(geometry);
            }
            geometries
        }
    }
}

/// Builds the map overlay for a report.
///
/// Point requests get none; the renderer draws the buffers itself.
pub async fn report_overlay(state: &AppState, request: &EngineRequest) -> Option<FeatureCollection> {
    let features = match request {
        EngineRequest::Points { .. } => return None,
        EngineRequest::Shape { shapefile, .. } => number_sites(shapefile.features.clone()),
        EngineRequest::Fips { fips, .. } => {
            let code = fips.first()?;
            vec![boundary_feature(state, code).await?]
        }
    };

    Some(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Tags shape features with site identifiers `1..=n`.
fn number_sites(mut features: Vec<Feature>) -> Vec<Feature> {
    for (id, feature) in (1_u64..).zip(features.iter_mut()) {
        feature.set_property(SITE_ID_PROPERTY, id);
    }
    features
}

/// Standardized boundary feature for a state or county code.
///
/// Returns `None` for other granularities. A boundary that cannot be
/// found yields a feature with `null` geometry that still carries the
/// requested code and whatever attributes the reference tables know.
async fn boundary_feature(state: &AppState, code: &str) -> Option<Feature> {
    let (raw, id_column) = raw_boundary(state, code).await?;
    Some(standardize(raw, id_column, Some(code), state.tables.as_ref()))
}

/// Boundary feature for a state or county code as its source provides
/// it, with the property that carries its code. Missing boundaries come
/// back as an empty feature.
async fn raw_boundary(state: &AppState, code: &str) -> Option<(Feature, &'static str)> {
    match Granularity::classify(code) {
        Granularity::State => {
            let Some(raw) = state.states.get(code).cloned() else {
                log::warn!("No state boundary loaded for {code}");
                return Some((empty_feature(), columns::FIPS));
            };
            let id_column = STATE_ID_COLUMNS
                .iter()
                .copied()
                .find(|c| raw.contains_property(c))
                .unwrap_or(columns::FIPS);
            Some((raw, id_column))
        }
        Granularity::County => {
            let raw = match fetch_county(&state.client, &state.config.feature_service_url, code)
                .await
            {
                Ok(features) => select_feature(features, code).unwrap_or_else(|| {
                    log::warn!("Feature service returned no boundary for {code}");
                    empty_feature()
                }),
                Err(e) => {
                    log::warn!("Failed to fetch county boundary for {code}: {e}");
                    empty_feature()
                }
            };
            Some((raw, columns::FIPS))
        }
        _ => None,
    }
}

const fn empty_feature() -> Feature {
    Feature {
        bbox: None,
        geometry: None,
        id: None,
        properties: None,
        foreign_members: None,
    }
}
