//! Configuration loading for the patrimonio CLI.

use anyhow::{Context, Result};
use pt_core::db::{PoolOptions, RetryConfig};
use pt_core::MismatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Detection processing settings.
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Serve the OpenAPI document.
    #[serde(default = "default_true")]
    pub enable_openapi: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            enable_openapi: true,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (sqlite:// or postgres://).
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum pool size.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a free connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://patrimonio.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Pool options from this section, with `DATABASE_*` env overrides applied.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            ..PoolOptions::default()
        }
        .with_env_overrides()
    }
}

/// Detection processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// What to do when an asset is detected at a sensor that does not
    /// border its current location (`force_entry` or `reject`).
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,

    /// How far (in milliseconds) a detection may trail the asset's last
    /// sighting and still be applied, to absorb reader clock skew.
    /// Zero rejects every late detection.
    #[serde(default)]
    pub stale_tolerance_ms: u64,

    /// Retry policy for concurrent updates of the same asset.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl TrackingConfig {
    /// Returns the late-detection tolerance as a duration.
    pub fn stale_tolerance(&self) -> Duration {
        Duration::from_millis(self.stale_tolerance_ms)
    }
}

/// Retry settings in config-file units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    10
}

fn default_max_delay_ms() -> u64 {
    500
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Converts to the runtime retry configuration.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::default()
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://patrimonio.db?mode=rwc");
        assert_eq!(config.tracking.mismatch_policy, MismatchPolicy::ForceEntry);
        assert_eq!(config.tracking.retry.max_retries, 3);
        assert_eq!(config.tracking.stale_tolerance_ms, 0);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  port: 9090

database:
  url: postgres://tracker:secret@db/patrimonio
  max_connections: 50

tracking:
  mismatch_policy: reject
  stale_tolerance_ms: 2000
  retry:
    max_retries: 5
    initial_delay_ms: 20
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.tracking.mismatch_policy, MismatchPolicy::Reject);
        assert_eq!(
            config.tracking.stale_tolerance(),
            Duration::from_millis(2000)
        );

        let retry = config.tracking.retry.to_retry_config();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(20));
        assert_eq!(retry.max_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let yaml = "tracking:\n  mismatch_policy: teleport\n";
        assert!(serde_yaml::from_str::<AppConfig>(yaml).is_err());
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.yaml");
        let config = AppConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.server.port, 8080);

        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "logging:\n  level: debug\n  json_format: true").unwrap();

        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }
}
