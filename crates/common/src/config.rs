//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Place listing defaults and bounds.
    #[serde(default)]
    pub listing: ListingConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Place listing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    /// Page size used when the request does not give one.
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Upper bound applied to the requested page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
    /// Search radius in kilometers used when only coordinates are given.
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_radius_km: default_radius_km(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_limit() -> u64 {
    10
}

const fn default_max_limit() -> u64 {
    100
}

const fn default_radius_km() -> f64 {
    5.0
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `WAYFIND_ENV`)
    /// 4. Environment variables with `WAYFIND__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("WAYFIND_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WAYFIND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("WAYFIND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_defaults_apply_when_sections_are_missing() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/wayfind"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.listing.default_limit, 10);
        assert_eq!(config.listing.max_limit, 100);
        assert_eq!(config.listing.default_radius_km, 5.0);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_listing_overrides() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/wayfind"

            [listing]
            max_limit = 50
            default_radius_km = 2.5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listing.max_limit, 50);
        assert_eq!(config.listing.default_limit, 10);
        assert_eq!(config.listing.default_radius_km, 2.5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        assert!(from_toml("[server]\nport = 8080\n").is_err());
    }
}
