//! API configuration
//!
//! Loaded from built-in defaults, then an optional `config/olive-ledger`
//! file (any format the `config` crate understands), then `LEDGER_`
//! prefixed environment variables.

use serde::Deserialize;
use std::time::Duration;

use infra_db::DatabaseConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Upper bound of the connection pool
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// Longest wait for a barrel lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Log level, used when `RUST_LOG` is not set
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/olive_ledger".to_string(),
            max_connections: 10,
            min_connections: 2,
            lock_timeout_ms: 10_000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the config file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_sources(config::Environment::with_prefix("LEDGER"))
    }

    fn from_sources(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_url", defaults.database_url)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("min_connections", i64::from(defaults.min_connections))?
            .set_default("lock_timeout_ms", defaults.lock_timeout_ms as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", "pretty")?
            .add_source(config::File::with_name("config/olive-ledger").required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for the ledger database
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .lock_timeout(Duration::from_millis(self.lock_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> ApiConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_sources(config::Environment::with_prefix("LEDGER").source(Some(source)))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_environment_overrides() {
        let config = load_with(&[
            ("LEDGER_PORT", "9090"),
            ("LEDGER_DATABASE_URL", "postgres://db/ledger"),
            ("LEDGER_MAX_CONNECTIONS", "25"),
            ("LEDGER_LOG_FORMAT", "json"),
            ("LEDGER_LOCK_TIMEOUT_MS", "2500"),
        ]);

        assert_eq!(config.port, 9090);
        assert_eq!(config.log_format, LogFormat::Json);

        let database = config.database();
        assert_eq!(database.url, "postgres://db/ledger");
        assert_eq!(database.max_connections, 25);
        assert_eq!(database.min_connections, 2);
        assert_eq!(database.lock_timeout, Duration::from_millis(2500));
    }
}
