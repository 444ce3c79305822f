use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Application configuration with validation.
///
/// Values are layered: `config/default.toml`, then `config/{environment}.toml`,
/// then environment variables prefixed with `TOKO_`.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    /// Minimum number of pooled connections
    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    /// Run schema migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

impl AppConfig {
    /// Builds a configuration directly from the given database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            db_max_connections: default_max_connections(),
            db_min_connections: default_min_connections(),
            auto_migrate: false,
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }

    /// Loads configuration from files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("TOKO_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
            .add_source(Environment::with_prefix("TOKO").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        app_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

        info!(
            environment = %app_config.environment,
            max_connections = app_config.db_max_connections,
            "Configuration loaded"
        );

        Ok(app_config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let cfg = AppConfig::new("sqlite::memory:");
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.db_min_connections, 1);
        assert!(!cfg.auto_migrate);
        assert!(!cfg.is_production());
    }

    #[test]
    fn empty_database_url_fails_validation() {
        let cfg = AppConfig::new("");
        assert!(cfg.validate().is_err());
    }
}
