//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with GATEHOUSE_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the scorer API key belong in environment variables, not in
//! the config file. Runtime-tunable moderation settings live in the
//! database-backed [`crate::config::Config`] instead.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Risk scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Base URL of the scoring service, e.g. "http://localhost:5000"
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// API key, if the scorer requires one
    /// (env var GATEHOUSE_SCORER_API_KEY)
    #[serde(default)]
    pub api_key: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            timeout_ms: 5000,
            api_key: String::new(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scorer: ScorerConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (GATEHOUSE_ prefix)
            // e.g., GATEHOUSE_SCORER_URL, GATEHOUSE_SERVER_BIND_ADDRESS
            .add_source(
                Environment::with_prefix("GATEHOUSE")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Initialize application configuration
///
/// Triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = APP_CONFIG.read().unwrap();
    log::info!(
        "Configuration loaded: scorer.url = {}, server.bind_address = {}",
        config.scorer.url,
        config.server.bind_address
    );
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get scorer configuration
pub fn scorer() -> ScorerConfig {
    get_config().scorer
}

/// Get server configuration
pub fn server() -> ServerConfig {
    get_config().server
}
