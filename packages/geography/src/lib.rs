#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geography code resolution and boundary overlays.
//!
//! Resolves user-supplied place names or FIPS codes to canonical codes at
//! a requested granularity, and builds the map-ready boundary overlays
//! that accompany analysis results: pre-loaded state polygons (read from
//! disk or downloaded from `TIGERweb`), county polygons fetched from an
//! `ArcGIS` feature service, and buffer circles around site points. Reference tables are loaded once at startup and
//! shared read-only across requests.

pub mod attributes;
pub mod boundaries;
pub mod buffer;
pub mod feature_service;
pub mod resolve;
pub mod tables;
pub mod tigerweb;

use ej_api_geography_models::{GeographyRecord, Granularity, NameResolution};
use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` structure was invalid.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Reference table could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reference file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Expanding a code to a finer granularity produced nothing.
    #[error("No {target} codes found within {code}")]
    EmptyExpansion {
        /// The code that was expanded.
        code: String,
        /// The granularity that was requested.
        target: Granularity,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Census geography lookups consumed by the resolver and the overlay
/// attribute pipeline.
///
/// Implementations are read-only after construction and shared across
/// concurrent requests.
pub trait GeographyLookup: Send + Sync {
    /// Translates a human-readable place name into a code.
    ///
    /// Inputs that are not recognized names come back as
    /// [`NameResolution::NotAName`] with the original text.
    fn name_to_code(&self, area: &str) -> NameResolution;

    /// Returns the reference row for a normalized code.
    fn record(&self, fips: &str) -> Option<&GeographyRecord>;

    /// Returns every code at `level` contained within `parent`, in code
    /// order.
    fn codes_within(&self, parent: &str, level: Granularity) -> Vec<String>;
}
