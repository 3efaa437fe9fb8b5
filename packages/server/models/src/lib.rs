#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the EJ API server.
//!
//! These types describe the HTTP contract only. They are kept apart from
//! the engine request types so the wire format of either side can change
//! without touching the other.

use serde::{Deserialize, Serialize};

/// Body of `POST /data`.
///
/// Exactly one of `sites`, `shape`, and `fips` is expected, or instead an
/// explicit `method` (`latlon`, `SHP`, `FIPS`) with its `area`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataRequest {
    /// Site coordinates, as rows or columns of `lat`/`lon`.
    pub sites: Option<serde_json::Value>,
    /// `GeoJSON` text for one or more polygons.
    pub shape: Option<String>,
    /// Geography code or place name.
    pub fips: Option<String>,
    /// Input method naming how `area` is to be read.
    pub method: Option<String>,
    /// Raw area input for `method`.
    pub area: Option<serde_json::Value>,
    /// Buffer radius in miles, number or numeric string.
    pub buffer: Option<serde_json::Value>,
    /// Attach a `geometry` to every result row.
    #[serde(default)]
    pub geometries: bool,
    /// Granularity to expand a geography code to (`county`,
    /// `blockgroup`, ...).
    pub scale: Option<String>,
}

/// Query parameters for `GET /report`.
///
/// Values are kept as text so malformed numbers can be reported with a
/// readable message instead of a generic extractor error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportParams {
    /// Site latitude, paired with `lon`.
    pub lat: Option<String>,
    /// Site longitude, paired with `lat`.
    pub lon: Option<String>,
    /// `GeoJSON` text.
    pub shape: Option<String>,
    /// Geography code or place name.
    pub fips: Option<String>,
    /// Buffer radius in miles.
    pub buffer: Option<String>,
}

/// Error payload of the JSON endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is up.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}
