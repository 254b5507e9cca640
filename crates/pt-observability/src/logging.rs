//! Logging infrastructure.
//!
//! `RUST_LOG` always wins over the configured level.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events are shown at the configured level when `RUST_LOG`
/// is not set.
const LOG_TARGETS: &[&str] = &["pt_core", "pt_api", "pt_cli", "pt_observability", "tower_http"];

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include span enter/close events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include thread IDs.
    pub include_thread_ids: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Verbose output for local development.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            include_spans: true,
            include_location: true,
            include_thread_ids: true,
            ..Self::default()
        }
    }

    /// JSON output for log aggregation.
    pub fn production() -> Self {
        Self {
            json_format: true,
            ..Self::default()
        }
    }

    /// Builds a configuration from a level name such as `"debug"`.
    pub fn from_level_str(level: &str, json_format: bool) -> Result<Self, String> {
        let level = Level::from_str(level)
            .map_err(|_| format!("invalid log level '{}'", level))?;
        Ok(Self {
            level,
            json_format,
            ..Self::default()
        })
    }

    fn default_filter(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
///
/// Must be called at most once per process.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
    }

    #[test]
    fn test_production_is_json() {
        assert!(LoggingConfig::production().json_format);
        assert_eq!(LoggingConfig::development().level, Level::DEBUG);
    }

    #[test]
    fn test_from_level_str() {
        let config = LoggingConfig::from_level_str("warn", true).unwrap();
        assert_eq!(config.level, Level::WARN);
        assert!(config.json_format);
        assert!(LoggingConfig::from_level_str("loud", false).is_err());
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let filter = LoggingConfig::default().default_filter();
        assert!(filter.contains("pt_core=info"));
        assert!(filter.contains("pt_api=info"));
    }
}
