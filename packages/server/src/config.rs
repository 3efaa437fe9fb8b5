//! Server configuration.
//!
//! Settings are read from an optional TOML file named by `EJ_API_CONFIG`,
//! then overridden by `BIND_ADDR`, `PORT`, `ENGINE_URL`, and
//! `ASSETS_DIR` from the environment.

use std::path::PathBuf;

use ej_api_geography::{
    feature_service::DEFAULT_COUNTY_SERVICE_URL, tigerweb::DEFAULT_STATE_SERVICE_URL,
};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "EJ_API_CONFIG";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`ServerConfig`].
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Base URL of the analysis engine.
    pub engine_url: String,
    /// County boundary feature service query endpoint.
    pub feature_service_url: String,
    /// CSV of geography codes, names, populations, and areas.
    pub reference_table: PathBuf,
    /// `GeoJSON` `FeatureCollection` of state boundaries.
    pub state_boundaries: PathBuf,
    /// `TIGERweb` States layer used when `state_boundaries` is missing.
    pub state_service_url: String,
    /// Directory of static files served at `/`.
    pub assets_dir: PathBuf,
    /// Title printed on rendered reports.
    pub report_title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            engine_url: "http://127.0.0.1:8000".to_string(),
            feature_service_url: DEFAULT_COUNTY_SERVICE_URL.to_string(),
            reference_table: PathBuf::from("data/geographies.csv"),
            state_boundaries: PathBuf::from("data/states.geojson"),
            state_service_url: DEFAULT_STATE_SERVICE_URL.to_string(),
            assets_dir: PathBuf::from("www"),
            report_title: "EJ Analysis Report".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from the file named by [`CONFIG_ENV`], if
    /// any, and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Reading configuration from {}", path.display());
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides read through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = var("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: "PORT",
                    value: port,
                })?;
        }
        if let Some(url) = var("ENGINE_URL") {
            self.engine_url = url;
        }
        if let Some(dir) = var("ASSETS_DIR") {
            self.assets_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            port = 9090
            report_title = "Community Report"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.report_title, "Community Report");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.reference_table, PathBuf::from("data/geographies.csv"));
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(matches!(
            ServerConfig::from_toml("port = \"eighty\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(|name| match name {
                "PORT" => Some("3000".to_string()),
                "ENGINE_URL" => Some("http://engine:8000".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.engine_url, "http://engine:8000");
        assert_eq!(config.assets_dir, PathBuf::from("www"));
    }

    #[test]
    fn bad_port_is_reported() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_overrides(|name| (name == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: http");
    }
}
