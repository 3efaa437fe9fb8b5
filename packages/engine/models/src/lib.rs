#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and result types for the analysis engine.
//!
//! An analysis runs over exactly one kind of area: a list of site points,
//! a submitted shape, or a census geography code, each with a buffer
//! radius in miles. The engine answers with a per-site result table or an
//! error marker, and can render a single-site HTML report from a result.

pub mod area;
pub mod buffer;

pub use area::{AreaError, AreaSpecification, SitePoint};
pub use buffer::BufferRadius;

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which input shape a request carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum InputMethod {
    /// Site coordinates.
    #[serde(rename = "latlon")]
    #[strum(serialize = "latlon")]
    Latlon,
    /// Encoded polygon or multipolygon.
    #[serde(rename = "SHP")]
    #[strum(serialize = "SHP")]
    Shp,
    /// Census geography code.
    #[serde(rename = "FIPS")]
    #[strum(serialize = "FIPS")]
    Fips,
}

/// The HTTP endpoint a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// JSON data endpoint.
    Data,
    /// HTML report endpoint.
    Report,
}

/// Per-site statistics returned by the engine.
///
/// The columns of each row are engine-defined and passed through
/// untouched. Everything besides the per-site table is kept as opaque
/// metadata so it can be handed back to the report renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// One row per site, in site order.
    #[serde(default)]
    pub results_bysite: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Engine-internal fields.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// What the engine returned for an analysis call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The engine produced a result set.
    Completed(AnalysisResult),
    /// The result carried an error marker.
    Failed {
        /// The engine's message, verbatim.
        error: String,
    },
}

impl EngineOutcome {
    /// Interprets an engine response body.
    ///
    /// Any object with a non-null `error` field is a failure; string
    /// messages are used as-is, arrays of strings are joined, anything
    /// else is rendered as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if a non-error body does not have
    /// the shape of an [`AnalysisResult`].
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if let Some(marker) = value.get("error").filter(|v| !v.is_null()) {
            let error = match marker {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join("; "),
                other => other.to_string(),
            };
            return Ok(Self::Failed { error });
        }

        serde_json::from_value(value).map(Self::Completed)
    }
}

/// Body of an analysis call to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method")]
pub enum EngineRequest {
    /// Aggregate around site points.
    #[serde(rename = "latlon")]
    Points {
        /// Sites in request order.
        sitepoints: Vec<SitePoint>,
        /// Buffer radius in miles.
        radius: f64,
    },
    /// Aggregate within (and around) submitted shapes.
    #[serde(rename = "SHP")]
    Shape {
        /// One feature per site.
        shapefile: FeatureCollection,
        /// Buffer radius in miles.
        radius: f64,
    },
    /// Aggregate over census geographies.
    #[serde(rename = "FIPS")]
    Fips {
        /// One code per site.
        fips: Vec<String>,
        /// Buffer radius in miles.
        radius: f64,
    },
}

impl EngineRequest {
    /// The input method this request represents.
    #[must_use]
    pub const fn method(&self) -> InputMethod {
        match self {
            Self::Points { .. } => InputMethod::Latlon,
            Self::Shape { .. } => InputMethod::Shp,
            Self::Fips { .. } => InputMethod::Fips,
        }
    }
}

/// Body of a report rendering call to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    /// The analysis result to report on.
    pub result: AnalysisResult,
    /// 1-based index of the site to report.
    pub sitenumber: u32,
    /// Return the HTML document instead of opening it.
    pub return_html: bool,
    /// How the analyzed area was specified.
    pub method: InputMethod,
    /// Boundary overlay for the map, when one applies.
    pub shp: Option<FeatureCollection>,
    /// Title printed on the report.
    pub report_title: String,
}
