//! Database layer for the patrimonio tracker.
//!
//! Persists locations, assets, sensors and the movement log using SQLx with
//! support for both SQLite (development) and PostgreSQL (production).

mod error;
pub mod mocks;
mod pool;
pub mod retry;
mod schema;

pub mod asset_repo;
pub mod location_repo;
pub mod movement_repo;
pub mod sensor_repo;

pub use error::DbError;
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use retry::{is_transient_error, with_retry, RetryConfig, Retryable};
pub use schema::run_migrations;

// Re-export repository traits and types
pub use asset_repo::{AssetRepository, AssetUpdate};
pub use location_repo::{LocationRepository, LocationUpdate};
pub use movement_repo::{MovementCommit, MovementFilter, MovementRepository};
pub use sensor_repo::{SensorRepository, SensorUpdate};

// Re-export factory functions
#[cfg(feature = "database")]
pub use asset_repo::create_asset_repository;
#[cfg(feature = "database")]
pub use location_repo::create_location_repository;
#[cfg(feature = "database")]
pub use movement_repo::create_movement_repository;
#[cfg(feature = "database")]
pub use sensor_repo::create_sensor_repository;

// SQLite stores ids and timestamps as TEXT. Timestamps use a fixed-width
// RFC 3339 form so that string comparison matches chronological order.

#[cfg(feature = "database")]
pub(crate) fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(feature = "database")]
pub(crate) fn parse_timestamp(value: &str) -> Result<chrono::DateTime<chrono::Utc>, DbError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| DbError::Serialization(format!("invalid timestamp '{}': {}", value, e)))
}

#[cfg(feature = "database")]
pub(crate) fn parse_uuid(value: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| DbError::Serialization(format!("invalid uuid '{}': {}", value, e)))
}
