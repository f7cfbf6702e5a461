//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::DEFAULT_MAX_ATTEMPTS;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is
///   used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `CHECKOUT_MAX_ATTEMPTS`: attempts per checkout or cart mutation on
///   concurrency conflicts (default: `2`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub checkout_max_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed(&lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            checkout_max_attempts: parsed(&lookup, "CHECKOUT_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.checkout_max_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            checkout_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
