//! In-memory store implementing every repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::asset::Asset;
use crate::db::{
    AssetRepository, AssetUpdate, DbError, LocationRepository, LocationUpdate, MovementCommit,
    MovementFilter, MovementRepository, SensorRepository, SensorUpdate,
};
use crate::location::Location;
use crate::movement::MovementRecord;
use crate::sensor::Sensor;

#[derive(Default)]
struct Tables {
    locations: Vec<Location>,
    assets: Vec<Asset>,
    sensors: Vec<Sensor>,
    movements: Vec<MovementRecord>,
}

impl Tables {
    fn has_location(&self, id: Uuid) -> bool {
        self.locations.iter().any(|l| l.id == id)
    }

    fn location_in_use(&self, id: Uuid) -> bool {
        self.assets.iter().any(|a| a.current_location_id == id)
            || self.sensors.iter().any(|s| s.references(id))
            || self
                .movements
                .iter()
                .any(|m| m.from_location_id == id || m.to_location_id == id)
    }

    fn check_sensor(&self, sensor: &Sensor) -> Result<(), DbError> {
        if !sensor.has_distinct_sides() {
            return Err(DbError::Constraint(
                "sensor exit and entry locations must differ".to_string(),
            ));
        }
        if !self.has_location(sensor.exit_location_id)
            || !self.has_location(sensor.entry_location_id)
        {
            return Err(DbError::Constraint(
                "sensor references an unknown location".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mock store shared by all four repository traits.
///
/// Clones share the same tables, so one store can be handed out as
/// `Arc<dyn AssetRepository>`, `Arc<dyn MovementRepository>` and so on.
#[derive(Clone, Default)]
pub struct MockStore {
    tables: Arc<RwLock<Tables>>,
}

impl MockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a snapshot of all movements in insertion order.
    pub async fn movements(&self) -> Vec<MovementRecord> {
        self.tables.read().await.movements.clone()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl LocationRepository for MockStore {
    async fn create(&self, location: &Location) -> Result<Location, DbError> {
        let mut tables = self.tables.write().await;

        if tables.has_location(location.id) {
            return Err(DbError::Constraint(format!(
                "Location with id '{}' already exists",
                location.id
            )));
        }

        tables.locations.push(location.clone());
        Ok(location.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Location>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Location>, DbError> {
        Ok(self.tables.read().await.locations.clone())
    }

    async fn update(&self, id: Uuid, update: &LocationUpdate) -> Result<Location, DbError> {
        let mut tables = self.tables.write().await;
        let location = tables
            .locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| DbError::not_found("Location", id))?;

        if let Some(name) = &update.name {
            location.name = name.clone();
        }
        Ok(location.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;

        if !tables.has_location(id) {
            return Ok(false);
        }
        if tables.location_in_use(id) {
            return Err(DbError::Constraint(format!("location {} is still referenced", id)));
        }

        tables.locations.retain(|l| l.id != id);
        Ok(true)
    }

    async fn count(&self) -> Result<i64, DbError> {
        Ok(self.tables.read().await.locations.len() as i64)
    }
}

#[async_trait]
impl AssetRepository for MockStore {
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError> {
        let mut tables = self.tables.write().await;

        if tables
            .assets
            .iter()
            .any(|a| a.id == asset.id || a.external_tag == asset.external_tag)
        {
            return Err(DbError::Constraint(format!(
                "Asset with tag '{}' already exists",
                asset.external_tag
            )));
        }
        if !tables.has_location(asset.current_location_id) {
            return Err(DbError::Constraint(
                "asset references an unknown location".to_string(),
            ));
        }

        tables.assets.push(asset.clone());
        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.assets.iter().find(|a| a.id == id).cloned())
    }

    async fn get_by_tag(&self, external_tag: &str) -> Result<Option<Asset>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .assets
            .iter()
            .find(|a| a.external_tag == external_tag)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Asset>, DbError> {
        Ok(self.tables.read().await.assets.clone())
    }

    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError> {
        let mut tables = self.tables.write().await;
        let asset = tables
            .assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DbError::not_found("Asset", id))?;

        if let Some(name) = &update.name {
            asset.name = name.clone();
        }
        asset.version += 1;
        Ok(asset.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.assets.len();
        tables.assets.retain(|a| a.id != id);
        let removed = tables.assets.len() < before;
        if removed {
            tables.movements.retain(|m| m.asset_id != id);
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<i64, DbError> {
        Ok(self.tables.read().await.assets.len() as i64)
    }
}

#[async_trait]
impl SensorRepository for MockStore {
    async fn create(&self, sensor: &Sensor) -> Result<Sensor, DbError> {
        let mut tables = self.tables.write().await;

        if tables.sensors.iter().any(|s| s.id == sensor.id) {
            return Err(DbError::Constraint(format!(
                "Sensor with id '{}' already exists",
                sensor.id
            )));
        }
        tables.check_sensor(sensor)?;

        tables.sensors.push(sensor.clone());
        Ok(sensor.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sensor>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.sensors.iter().find(|s| s.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Sensor>, DbError> {
        Ok(self.tables.read().await.sensors.clone())
    }

    async fn update(&self, id: Uuid, update: &SensorUpdate) -> Result<Sensor, DbError> {
        let mut tables = self.tables.write().await;
        let index = tables
            .sensors
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DbError::not_found("Sensor", id))?;

        let merged = update.apply_to(&tables.sensors[index]);
        tables.check_sensor(&merged)?;
        tables.sensors[index] = merged.clone();
        Ok(merged)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;

        if !tables.sensors.iter().any(|s| s.id == id) {
            return Ok(false);
        }
        if tables.movements.iter().any(|m| m.sensor_id == id) {
            return Err(DbError::Constraint(format!("sensor {} is still referenced", id)));
        }

        tables.sensors.retain(|s| s.id != id);
        Ok(true)
    }

    async fn count(&self) -> Result<i64, DbError> {
        Ok(self.tables.read().await.sensors.len() as i64)
    }
}

#[async_trait]
impl MovementRepository for MockStore {
    async fn record(&self, commit: &MovementCommit) -> Result<MovementRecord, DbError> {
        let mut tables = self.tables.write().await;
        let record = &commit.record;

        if !tables
            .assets
            .iter()
            .any(|a| a.id == record.asset_id && a.version == commit.expected_version)
        {
            return Err(DbError::Conflict(format!(
                "asset {} is no longer at version {}",
                record.asset_id, commit.expected_version
            )));
        }
        if !tables.has_location(record.from_location_id)
            || !tables.has_location(record.to_location_id)
        {
            return Err(DbError::Constraint(
                "movement references an unknown location".to_string(),
            ));
        }
        if !tables.sensors.iter().any(|s| s.id == record.sensor_id) {
            return Err(DbError::Constraint(format!(
                "movement references unknown sensor {}",
                record.sensor_id
            )));
        }

        let Some(asset) = tables.assets.iter_mut().find(|a| a.id == record.asset_id) else {
            return Err(DbError::not_found("Asset", record.asset_id));
        };

        asset.current_location_id = record.to_location_id;
        asset.last_seen_at = record.occurred_at;
        asset.version += 1;

        tables.movements.push(record.clone());
        Ok(record.clone())
    }

    async fn list(&self, filter: &MovementFilter) -> Result<Vec<MovementRecord>, DbError> {
        let tables = self.tables.read().await;
        let mut movements: Vec<MovementRecord> = tables
            .movements
            .iter()
            .filter(|m| filter.asset_id.map_or(true, |id| m.asset_id == id))
            .filter(|m| filter.sensor_id.map_or(true, |id| m.sensor_id == id))
            .cloned()
            .collect();

        // Stable sort keeps insertion order among equal timestamps.
        movements.sort_by_key(|m| m.occurred_at);
        Ok(movements)
    }

    async fn latest_for_asset(&self, asset_id: Uuid) -> Result<Option<MovementRecord>, DbError> {
        let history = self.list_for_asset(asset_id).await?;
        Ok(history.into_iter().last())
    }

    async fn count(&self) -> Result<i64, DbError> {
        Ok(self.tables.read().await.movements.len() as i64)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .movements
            .iter()
            .filter(|m| m.occurred_at >= since)
            .count() as i64)
    }
}
