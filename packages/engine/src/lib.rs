#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis engine client and input method dispatch.
//!
//! The demographic and environmental computation lives in an external
//! analysis engine. This crate defines the contract the server talks to
//! ([`AnalysisEngine`]), an HTTP implementation of it
//! ([`remote::RemoteEngine`]), and the dispatcher that validates request
//! input and builds the engine call for each input method.

pub mod dispatch;
pub mod remote;

use ej_api_engine_models::{EngineOutcome, EngineRequest, ReportRequest};
use thiserror::Error;

/// Errors talking to the analysis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Engine response was not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine rejected the call. The message is the engine's own.
    #[error("{message}")]
    Remote {
        /// HTTP status code returned by the engine.
        status: u16,
        /// Message reported by the engine.
        message: String,
    },
}

/// The external analysis engine.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait::async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Runs an analysis and returns the per-site result set, or the
    /// engine's error marker.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine cannot be reached or fails
    /// outside of its own error marker.
    async fn analyze(&self, request: &EngineRequest) -> Result<EngineOutcome, EngineError>;

    /// Renders a single-site HTML report.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine cannot be reached or fails to
    /// render.
    async fn render_report(&self, request: &ReportRequest) -> Result<String, EngineError>;
}
