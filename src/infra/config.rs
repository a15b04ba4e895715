//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! API keys may be supplied in the TOML file or via the GEOCODER_API_KEY
//! and ROUTER_API_KEY environment variables (env wins).

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_http_port() }
    }
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    /// Forward geocoding endpoint (OpenCage-compatible JSON API)
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            api_key: String::new(),
            timeout_ms: default_provider_timeout_ms(),
        }
    }
}

fn default_geocoder_url() -> String {
    "https://api.opencagedata.com/geocode/v1/json".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Routing endpoint (GraphHopper-compatible JSON API)
    #[serde(default = "default_router_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            url: default_router_url(),
            api_key: String::new(),
            timeout_ms: default_provider_timeout_ms(),
        }
    }
}

fn default_router_url() -> String {
    "https://graphhopper.com/api/1/route".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Directory for timestamped database backups
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
}

fn default_db_path() -> String {
    "routes.db".to_string()
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { db_path: default_db_path(), backup_dir: default_backup_dir() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    http_port: u16,
    geocoder_url: String,
    geocoder_api_key: String,
    geocoder_timeout_ms: u64,
    router_url: String,
    router_api_key: String,
    router_timeout_ms: u64,
    db_path: String,
    backup_dir: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            geocoder_url: default_geocoder_url(),
            geocoder_api_key: String::new(),
            geocoder_timeout_ms: default_provider_timeout_ms(),
            router_url: default_router_url(),
            router_api_key: String::new(),
            router_timeout_ms: default_provider_timeout_ms(),
            db_path: default_db_path(),
            backup_dir: default_backup_dir(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine the config file path: an explicit --config argument wins,
    /// then the CONFIG_FILE environment variable, then the default
    pub fn resolve_config_path(cli_arg: Option<&str>) -> String {
        if let Some(path) = cli_arg {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let geocoder_api_key =
            env::var("GEOCODER_API_KEY").unwrap_or(toml_config.geocoder.api_key);
        let router_api_key = env::var("ROUTER_API_KEY").unwrap_or(toml_config.router.api_key);

        Ok(Self {
            http_port: toml_config.server.port,
            geocoder_url: toml_config.geocoder.url,
            geocoder_api_key,
            geocoder_timeout_ms: toml_config.geocoder.timeout_ms,
            router_url: toml_config.router.url,
            router_api_key,
            router_timeout_ms: toml_config.router.timeout_ms,
            db_path: toml_config.store.db_path,
            backup_dir: toml_config.store.backup_dir,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn geocoder_url(&self) -> &str {
        &self.geocoder_url
    }

    pub fn geocoder_api_key(&self) -> &str {
        &self.geocoder_api_key
    }

    pub fn geocoder_timeout_ms(&self) -> u64 {
        self.geocoder_timeout_ms
    }

    pub fn router_url(&self) -> &str {
        &self.router_url
    }

    pub fn router_api_key(&self) -> &str {
        &self.router_api_key
    }

    pub fn router_timeout_ms(&self) -> u64 {
        self.router_timeout_ms
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn backup_dir(&self) -> &str {
        &self.backup_dir
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to point the store at a scratch database
    #[cfg(test)]
    pub fn with_db_path(mut self, path: &str) -> Self {
        self.db_path = path.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http_port(), 8080);
        assert_eq!(config.geocoder_url(), "https://api.opencagedata.com/geocode/v1/json");
        assert_eq!(config.router_url(), "https://graphhopper.com/api/1/route");
        assert_eq!(config.geocoder_timeout_ms(), 10_000);
        assert_eq!(config.db_path(), "routes.db");
        assert_eq!(config.backup_dir(), "backups");
    }

    // Single test for all three sources: CONFIG_FILE is process-global, so
    // splitting these up would race under the parallel test runner
    #[test]
    fn test_resolve_config_path_precedence() {
        env::remove_var("CONFIG_FILE");
        assert_eq!(Config::resolve_config_path(None), "config/dev.toml");

        env::set_var("CONFIG_FILE", "config/env.toml");
        assert_eq!(Config::resolve_config_path(None), "config/env.toml");
        assert_eq!(
            Config::resolve_config_path(Some("config/cli.toml")),
            "config/cli.toml"
        );
        env::remove_var("CONFIG_FILE");
    }

    #[test]
    fn test_with_db_path_builder() {
        let config = Config::default().with_db_path("/tmp/test.db");
        assert_eq!(config.db_path(), "/tmp/test.db");
    }
}
