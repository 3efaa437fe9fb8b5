//! HTTP handler functions for the EJ API.

use std::str::FromStr as _;

use actix_web::{HttpResponse, web};
use ej_api_engine::{
    AnalysisEngine as _, EngineError,
    dispatch::{DispatchError, Dispatched, dispatch, dispatch_method},
};
use ej_api_engine_models::{AreaError, AreaSpecification, Endpoint, EngineOutcome, ReportRequest};
use ej_api_geography_models::Granularity;
use ej_api_server_models::{ApiError, ApiHealth, DataRequest, ReportParams};
use serde_json::{Value, json};

use crate::{AppState, assemble};

/// Message returned when the analysis engine cannot be reached or answers
/// with something unreadable.
pub const ENGINE_UNAVAILABLE: &str = "Analysis engine unavailable.";

/// Message for a report request without any area.
pub const MISSING_REPORT_AREA: &str = "You must provide valid coordinates, a shape, or a FIPS code.";

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /data`
///
/// Runs an analysis and returns the per-site rows as JSON.
pub async fn data(state: web::Data<AppState>, body: web::Json<DataRequest>) -> HttpResponse {
    let body = body.into_inner();

    let granularity = match body.scale.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(scale) => match Granularity::from_str(scale) {
            Ok(granularity) => Some(granularity),
            Err(_) => return bad_request_json(&format!("Unsupported scale: {scale}")),
        },
        None => None,
    };

    let dispatched = match dispatch_data(&state, &body, granularity).await {
        Ok(dispatched) => dispatched,
        Err(e) => return dispatch_failure_json(&e),
    };

    let result = match dispatched.outcome {
        EngineOutcome::Completed(result) => result,
        EngineOutcome::Failed { error } => return bad_request_json(&error),
    };

    let geometries = if body.geometries {
        Some(assemble::data_geometries(&state, &dispatched.request).await)
    } else {
        None
    };

    match assemble::data_rows(result, geometries) {
        Ok(payload) => HttpResponse::Ok().json(payload),
        Err(e) => {
            log::error!("Failed to assemble data response: {e}");
            bad_request_json(&e.to_string())
        }
    }
}

/// Runs the data analysis for whichever input form the body uses.
async fn dispatch_data(
    state: &AppState,
    body: &DataRequest,
    granularity: Option<Granularity>,
) -> Result<Dispatched, DispatchError> {
    let engine = state.engine.as_ref();
    let lookup = state.tables.as_ref();
    let buffer = body.buffer.as_ref();

    let Some(method) = body.method.as_deref() else {
        let area = AreaSpecification::from_inputs(
            body.sites.as_ref(),
            body.shape.as_deref(),
            body.fips.as_deref(),
        )?;
        return dispatch(engine, lookup, &area, buffer, granularity, Endpoint::Data).await;
    };

    if body.sites.is_some() || body.shape.is_some() || body.fips.is_some() {
        return Err(AreaError::Ambiguous.into());
    }
    let area = body.area.as_ref().ok_or(AreaError::Missing)?;
    dispatch_method(engine, lookup, method, area, buffer, granularity, Endpoint::Data).await
}

/// `GET /report`
///
/// Runs an analysis for one site and returns the rendered HTML report.
pub async fn report(state: web::Data<AppState>, params: web::Query<ReportParams>) -> HttpResponse {
    let params = params.into_inner();

    let area = match report_area(&params) {
        Ok(area) => area,
        Err(message) => return bad_request_html(&message),
    };
    let buffer = params.buffer.map(Value::String);

    let dispatched = match dispatch(
        state.engine.as_ref(),
        state.tables.as_ref(),
        &area,
        buffer.as_ref(),
        None,
        Endpoint::Report,
    )
    .await
    {
        Ok(dispatched) => dispatched,
        Err(e) => {
            log_dispatch_failure(&e);
            return bad_request_html(&dispatch_message(&e));
        }
    };

    let result = match dispatched.outcome {
        EngineOutcome::Completed(result) => result,
        EngineOutcome::Failed { error } => return bad_request_html(&error),
    };

    let overlay = assemble::report_overlay(&state, &dispatched.request).await;

    let request = ReportRequest {
        result,
        sitenumber: 1,
        return_html: true,
        method: dispatched.request.method(),
        shp: overlay,
        report_title: state.config.report_title.clone(),
    };

    match state.engine.render_report(&request).await {
        Ok(html) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(e) => {
            log::error!("Failed to render report: {e}");
            bad_request_html(&engine_message(&e))
        }
    }
}

/// Builds the report area from query parameters. `lat` and `lon` must
/// come together.
fn report_area(params: &ReportParams) -> Result<AreaSpecification, String> {
    let coordinate = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
    };

    let sites = match (
        coordinate(params.lat.as_deref()),
        coordinate(params.lon.as_deref()),
    ) {
        (None, None) => None,
        (Some(Some(lat)), Some(Some(lon))) => Some(json!([{ "lat": lat, "lon": lon }])),
        _ => return Err("Both lat and lon must be provided as numbers.".to_string()),
    };

    AreaSpecification::from_inputs(sites.as_ref(), params.shape.as_deref(), params.fips.as_deref())
        .map_err(|e| match e {
            AreaError::Missing => MISSING_REPORT_AREA.to_string(),
            AreaError::Ambiguous => {
                "Provide only one of coordinates, a shape, or a FIPS code.".to_string()
            }
            other => other.to_string(),
        })
}

fn log_dispatch_failure(e: &DispatchError) {
    match e {
        DispatchError::Engine(e) => log::error!("Analysis engine call failed: {e}"),
        other => log::warn!("Rejected request: {other}"),
    }
}

/// Text shown to the caller for an engine failure. Only the engine's own
/// message is passed through; transport detail stays in the log.
fn engine_message(e: &EngineError) -> String {
    match e {
        EngineError::Remote { message, .. } => message.clone(),
        EngineError::Http(_) | EngineError::Json(_) => ENGINE_UNAVAILABLE.to_string(),
    }
}

fn dispatch_message(e: &DispatchError) -> String {
    match e {
        DispatchError::Engine(e) => engine_message(e),
        other => other.to_string(),
    }
}

fn dispatch_failure_json(e: &DispatchError) -> HttpResponse {
    log_dispatch_failure(e);
    bad_request_json(&dispatch_message(e))
}

fn bad_request_json(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

/// Error page returned by the report endpoint.
#[must_use]
pub fn error_page(message: &str) -> String {
    format!(
        "<html><body><h3>Error</h3><p>{}</p></body></html>",
        escape_html(message)
    )
}

fn bad_request_html(message: &str) -> HttpResponse {
    HttpResponse::BadRequest()
        .content_type("text/html; charset=utf-8")
        .body(error_page(message))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
