//! Input method dispatch.
//!
//! Validates the buffer radius, turns the request's area into the engine
//! call for its input method, and makes that single call. Geography codes
//! on the data endpoint are resolved to the requested granularity; the
//! report endpoint only translates place names and keeps the single code
//! so the map overlay can be built for it.

use ej_api_engine_models::{
    AreaError, AreaSpecification, BufferRadius, Endpoint, EngineOutcome, EngineRequest,
};
use ej_api_geography::{GeoError, GeographyLookup, resolve::resolve};
use ej_api_geography_models::Granularity;
use thiserror::Error;

use crate::{AnalysisEngine, EngineError};

/// Errors raised before or during the engine call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request input was missing, malformed, or out of range.
    #[error(transparent)]
    Area(#[from] AreaError),

    /// Geography code resolution failed.
    #[error(transparent)]
    Geography(#[from] GeoError),

    /// The engine call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// An engine call and what it returned.
#[derive(Debug)]
pub struct Dispatched {
    /// The request that was sent.
    pub request: EngineRequest,
    /// The validated buffer radius.
    pub buffer: BufferRadius,
    /// The engine's answer.
    pub outcome: EngineOutcome,
}

/// Builds the engine request for an area without calling the engine.
///
/// # Errors
///
/// Returns [`DispatchError::Area`] if the buffer is invalid, or
/// [`DispatchError::Geography`] if a geography code cannot be resolved.
pub fn build_request(
    lookup: &dyn GeographyLookup,
    area: &AreaSpecification,
    buffer: Option<&serde_json::Value>,
    granularity: Option<Granularity>,
    endpoint: Endpoint,
) -> Result<(EngineRequest, BufferRadius), DispatchError> {
    let buffer = BufferRadius::parse(buffer)?;
    let radius = buffer.miles();

    let request = match area {
        AreaSpecification::Points(points) => EngineRequest::Points {
            sitepoints: points.clone(),
            radius,
        },
        AreaSpecification::Shape(shape) => EngineRequest::Shape {
            shapefile: shape.clone(),
            radius,
        },
        AreaSpecification::GeographyCode(code) => {
            // reports keep the single requested code for the map overlay
            let target = match endpoint {
                Endpoint::Data => granularity,
                Endpoint::Report => None,
            };
            let fips = resolve(lookup, code, target)?;
            EngineRequest::Fips { fips, radius }
        }
    };

    Ok((request, buffer))
}

/// Validates the request and runs the analysis.
///
/// # Errors
///
/// Returns [`DispatchError`] if validation, code resolution, or the engine
/// call fails. The engine's own error marker is not an error here; it is
/// returned as [`EngineOutcome::Failed`] for the caller to check.
pub async fn dispatch(
    engine: &dyn AnalysisEngine,
    lookup: &dyn GeographyLookup,
    area: &AreaSpecification,
    buffer: Option<&serde_json::Value>,
    granularity: Option<Granularity>,
    endpoint: Endpoint,
) -> Result<Dispatched, DispatchError> {
    let (request, buffer) = build_request(lookup, area, buffer, granularity, endpoint)?;
    let outcome = engine.analyze(&request).await?;

    if let EngineOutcome::Failed { error } = &outcome {
        log::warn!("Analysis engine reported an error: {error}");
    }

    Ok(Dispatched {
        request,
        buffer,
        outcome,
    })
}

/// Runs the analysis for an explicitly named input method (`latlon`,
/// `SHP`, or `FIPS`) and its raw input.
///
/// # Errors
///
/// Returns [`DispatchError::Area`] for an invalid buffer, an unsupported
/// method, or input that does not fit the method, plus everything
/// [`dispatch`] can return.
pub async fn dispatch_method(
    engine: &dyn AnalysisEngine,
    lookup: &dyn GeographyLookup,
    method: &str,
    area: &serde_json::Value,
    buffer: Option<&serde_json::Value>,
    granularity: Option<Granularity>,
    endpoint: Endpoint,
) -> Result<Dispatched, DispatchError> {
    BufferRadius::parse(buffer)?;
    let area = AreaSpecification::from_method(method, area)?;
    dispatch(engine, lookup, &area, buffer, granularity, endpoint).await
}
