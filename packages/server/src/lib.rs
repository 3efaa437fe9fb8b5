#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the EJ analysis facade.
//!
//! Exposes the analysis engine through a JSON data endpoint (`POST /data`)
//! and an HTML report endpoint (`GET /report`), and serves the static map
//! front-end from the assets directory. Reference tables and state
//! boundaries are loaded once at startup and shared read-only by every
//! request.

pub mod assemble;
pub mod config;
pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, error::InternalError, middleware, web};
use ej_api_engine::{AnalysisEngine, remote::RemoteEngine};
use ej_api_geography::{boundaries::StateBoundaries, tables::ReferenceTables, tigerweb};
use ej_api_server_models::ApiError;

pub use config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Analysis engine client.
    pub engine: Arc<dyn AnalysisEngine>,
    /// Geography reference table (names, populations, areas).
    pub tables: Arc<ReferenceTables>,
    /// Pre-loaded state boundary polygons.
    pub states: Arc<StateBoundaries>,
    /// HTTP client for the county feature service.
    pub client: reqwest::Client,
    /// Server settings.
    pub config: ServerConfig,
}

impl AppState {
    /// Builds the state for `config`, loading reference data from disk.
    ///
    /// State boundaries are downloaded from `TIGERweb` when the configured
    /// file does not exist. Reference data that cannot be loaded either
    /// way is logged and replaced with empty tables.
    pub async fn load(config: ServerConfig) -> Self {
        let tables = ReferenceTables::load(&config.reference_table).unwrap_or_else(|e| {
            log::warn!(
                "Failed to load reference table {}: {e}",
                config.reference_table.display()
            );
            ReferenceTables::empty()
        });

        let states = load_state_boundaries(&config).await;
        let client = reqwest::Client::new();
        let engine = RemoteEngine::new(client.clone(), config.engine_url.as_str());

        Self {
            engine: Arc::new(engine),
            tables: Arc::new(tables),
            states: Arc::new(states),
            client,
            config,
        }
    }
}

async fn load_state_boundaries(config: &ServerConfig) -> StateBoundaries {
    let path = &config.state_boundaries;

    let loaded = if path.exists() {
        StateBoundaries::load(path)
    } else {
        log::info!(
            "{} not found, downloading state boundaries from {}",
            path.display(),
            config.state_service_url
        );
        match tigerweb::client() {
            Ok(client) => tigerweb::fetch_state_boundaries(&client, &config.state_service_url).await,
            Err(e) => Err(e),
        }
    };

    loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load state boundaries: {e}");
        StateBoundaries::empty()
    })
}

/// Registers the API routes and extractor error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(handlers::health))
        .route("/data", web::post().to(handlers::data))
        .route("/report", web::get().to(handlers::report));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiError::new(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest()
            .content_type("text/html; charset=utf-8")
            .body(handlers::error_page(&err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

/// Starts the EJ API server.
///
/// Loads the configuration and reference data, then runs the Actix-Web
/// HTTP server until it is stopped. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration cannot be
/// loaded, or the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::load().map_err(std::io::Error::other)?;
    log::info!("Analysis engine at {}", config.engine_url);

    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let assets_dir = config.assets_dir.clone();

    let state = web::Data::new(AppState::load(config).await);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            // Serve front-end static files
            .service(Files::new("/", &assets_dir).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
