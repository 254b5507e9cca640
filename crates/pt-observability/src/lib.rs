//! # pt-observability
//!
//! Logging and metrics infrastructure for the patrimonio tracker.
//!
//! Structured logging is built on `tracing`; metrics go through the
//! `metrics` facade and are exported in Prometheus text format.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{install_prometheus_recorder, register_metrics};
