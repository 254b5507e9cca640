//! Response DTOs shared across routes.
//!
//! Request bodies live next to the handlers that accept them.

use chrono::{DateTime, Utc};
use pt_core::{Asset, Location, MovementRecord, Sensor, TransitionKind};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("healthy" or "unhealthy").
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database health.
    pub database: DatabaseHealth,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}

/// Database health details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    /// "sqlite" or "postgres".
    pub backend: String,
    pub pool_size: u32,
    pub idle_connections: usize,
}

// ============================================================================
// Entities
// ============================================================================

/// Location response DTO.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Location> for LocationResponse {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            name: location.name,
            created_at: location.created_at,
        }
    }
}

/// Asset response DTO.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    /// External tag (RFID EPC or similar).
    pub external_tag: String,
    pub name: String,
    pub current_location_id: Uuid,
    pub last_seen_at: DateTime<Utc>,
    /// Incremented on every committed change.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        Self {
            id: asset.id,
            external_tag: asset.external_tag,
            name: asset.name,
            current_location_id: asset.current_location_id,
            last_seen_at: asset.last_seen_at,
            version: asset.version,
            created_at: asset.created_at,
        }
    }
}

/// Sensor response DTO.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorResponse {
    pub id: Uuid,
    pub name: String,
    pub exit_location_id: Uuid,
    pub entry_location_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Sensor> for SensorResponse {
    fn from(sensor: Sensor) -> Self {
        Self {
            id: sensor.id,
            name: sensor.name,
            exit_location_id: sensor.exit_location_id,
            entry_location_id: sensor.entry_location_id,
            created_at: sensor.created_at,
        }
    }
}

/// Movement record response DTO.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementResponse {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub sensor_id: Uuid,
    /// "exit_to_entry", "entry_to_exit" or "forced".
    pub kind: String,
    /// "valid" for directional transitions, "suspicious" for forced ones.
    pub status: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<MovementRecord> for MovementResponse {
    fn from(record: MovementRecord) -> Self {
        let kind: TransitionKind = record.kind;
        Self {
            id: record.id,
            asset_id: record.asset_id,
            from_location_id: record.from_location_id,
            to_location_id: record.to_location_id,
            sensor_id: record.sensor_id,
            kind: kind.as_db_str().to_string(),
            status: kind.status().to_string(),
            occurred_at: record.occurred_at,
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Dashboard counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total_assets: i64,
    pub total_locations: i64,
    pub total_sensors: i64,
    pub total_movements: i64,
    /// Movements that occurred in the 24 hours before the request.
    pub movements_last_24h: i64,
}
