//! Startup validation for patrimonio configuration.
//!
//! Errors refuse startup; warnings are printed and startup continues.

use crate::config::AppConfig;
use colored::Colorize;
use pt_core::MismatchPolicy;
use pt_observability::LoggingConfig;

/// Late-detection tolerance above which validation warns.
const MAX_STALE_TOLERANCE_MS: u64 = 60_000;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent startup.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the application configuration.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_server(config, &mut result);
        Self::validate_database_url(config, &mut result);
        Self::validate_pool(config, &mut result);
        Self::validate_tracking(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        if addr.parse::<std::net::SocketAddr>().is_err() {
            result.add_error(format!("Invalid bind address '{}'", addr));
        }

        if config.server.request_timeout_secs == 0 {
            result.add_error("server.request_timeout_secs must be greater than 0");
        }
    }

    fn validate_database_url(config: &AppConfig, result: &mut ValidationResult) {
        let url = &config.database.url;

        if !url.starts_with("sqlite:")
            && !url.starts_with("postgres://")
            && !url.starts_with("postgresql://")
        {
            result.add_error(format!(
                "Invalid database URL '{}'. Must start with sqlite: or postgres://",
                url
            ));
        }

        if url.starts_with("sqlite::memory:") {
            result.add_warning(
                "In-memory SQLite database: all data is lost when the server stops, \
                 and each pooled connection sees its own empty database.",
            );
        }
    }

    fn validate_pool(config: &AppConfig, result: &mut ValidationResult) {
        let db = &config.database;

        if db.max_connections == 0 {
            result.add_error("database.max_connections must be greater than 0");
        } else if db.min_connections > db.max_connections {
            result.add_error(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            ));
        }
    }

    fn validate_tracking(config: &AppConfig, result: &mut ValidationResult) {
        let retry = &config.tracking.retry;

        if retry.initial_delay_ms > retry.max_delay_ms {
            result.add_error(format!(
                "tracking.retry.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                retry.initial_delay_ms, retry.max_delay_ms
            ));
        }

        if retry.max_retries == 0 {
            result.add_warning(
                "tracking.retry.max_retries is 0: concurrent detections of the same asset \
                 will fail with a conflict instead of being retried.",
            );
        }

        if config.tracking.stale_tolerance_ms > MAX_STALE_TOLERANCE_MS {
            result.add_warning(format!(
                "tracking.stale_tolerance_ms ({}) exceeds {} ms: late readings this old are \
                 applied instead of rejected.",
                config.tracking.stale_tolerance_ms, MAX_STALE_TOLERANCE_MS
            ));
        }

        if config.tracking.mismatch_policy == MismatchPolicy::Reject {
            result.add_warning(
                "tracking.mismatch_policy is 'reject': assets that skipped a sensor stay at \
                 their last known location until corrected by hand.",
            );
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) =
            LoggingConfig::from_level_str(&config.logging.level, config.logging.json_format)
        {
            result.add_error(format!("logging.level: {}", e));
        }
    }
}
