use serde::Deserialize;

use crate::utils::constants::{DEFAULT_FRESHNESS_WINDOW_SECS, DEFAULT_HTTP_TIMEOUT_MS};

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub token: TokenSettings,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

/// ================================
/// Token cache / credential exchange
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct TokenSettings {
    /// cached token is reused while younger than this
    #[serde(default = "default_freshness_window_seconds")]
    pub freshness_window_seconds: u64,
    /// upper bound on one credential exchange call
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            freshness_window_seconds: default_freshness_window_seconds(),
            exchange_timeout_ms: default_exchange_timeout_ms(),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_freshness_window_seconds() -> u64 {
    DEFAULT_FRESHNESS_WINDOW_SECS
}

fn default_exchange_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}
