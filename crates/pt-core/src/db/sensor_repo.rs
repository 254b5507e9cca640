//! Sensor repository for database operations.

use super::{DbError, DbPool};
use crate::sensor::Sensor;
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Partial update for a sensor.
#[derive(Debug, Clone, Default)]
pub struct SensorUpdate {
    /// New name for the sensor.
    pub name: Option<String>,
    /// New exit location.
    pub exit_location_id: Option<Uuid>,
    /// New entry location.
    pub entry_location_id: Option<Uuid>,
}

impl SensorUpdate {
    /// Applies this update on top of `sensor`, returning the merged result.
    pub fn apply_to(&self, sensor: &Sensor) -> Sensor {
        Sensor {
            name: self.name.clone().unwrap_or_else(|| sensor.name.clone()),
            exit_location_id: self.exit_location_id.unwrap_or(sensor.exit_location_id),
            entry_location_id: self.entry_location_id.unwrap_or(sensor.entry_location_id),
            ..sensor.clone()
        }
    }
}

/// Repository trait for sensor persistence.
#[async_trait]
pub trait SensorRepository: Send + Sync {
    /// Creates a new sensor. Fails with `Constraint` when both sides are the
    /// same location or either location does not exist.
    async fn create(&self, sensor: &Sensor) -> Result<Sensor, DbError>;

    /// Gets a sensor by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Sensor>, DbError>;

    /// Lists all sensors in insertion order.
    async fn list(&self) -> Result<Vec<Sensor>, DbError>;

    /// Updates a sensor.
    async fn update(&self, id: Uuid, update: &SensorUpdate) -> Result<Sensor, DbError>;

    /// Deletes a sensor. Fails with `Constraint` while movements reference it.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Counts all sensors.
    async fn count(&self) -> Result<i64, DbError>;
}

/// SQLite implementation of SensorRepository.
#[cfg(feature = "database")]
pub struct SqliteSensorRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteSensorRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SensorRepository for SqliteSensorRepository {
    async fn create(&self, sensor: &Sensor) -> Result<Sensor, DbError> {
        sqlx::query(
            r#"
            INSERT INTO sensors (id, name, exit_location_id, entry_location_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(sensor.id.to_string())
        .bind(&sensor.name)
        .bind(sensor.exit_location_id.to_string())
        .bind(sensor.entry_location_id.to_string())
        .bind(super::format_timestamp(&sensor.created_at))
        .execute(&self.pool)
        .await?;

        Ok(sensor.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sensor>, DbError> {
        let row: Option<SensorRow> = sqlx::query_as(
            r#"
            SELECT id, name, exit_location_id, entry_location_id, created_at
            FROM sensors
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Sensor>, DbError> {
        let rows: Vec<SensorRow> = sqlx::query_as(
            r#"
            SELECT id, name, exit_location_id, entry_location_id, created_at
            FROM sensors
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn update(&self, id: Uuid, update: &SensorUpdate) -> Result<Sensor, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE sensors SET
                name = COALESCE(?, name),
                exit_location_id = COALESCE(?, exit_location_id),
                entry_location_id = COALESCE(?, entry_location_id)
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(update.exit_location_id.map(|id| id.to_string()))
        .bind(update.entry_location_id.map(|id| id.to_string()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sensor", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sensor", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sensors WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// PostgreSQL implementation of SensorRepository.
#[cfg(feature = "database")]
pub struct PgSensorRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgSensorRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SensorRepository for PgSensorRepository {
    async fn create(&self, sensor: &Sensor) -> Result<Sensor, DbError> {
        sqlx::query(
            r#"
            INSERT INTO sensors (id, name, exit_location_id, entry_location_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(sensor.id)
        .bind(&sensor.name)
        .bind(sensor.exit_location_id)
        .bind(sensor.entry_location_id)
        .bind(sensor.created_at)
        .execute(&self.pool)
        .await?;

        Ok(sensor.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sensor>, DbError> {
        let row: Option<PgSensorRow> = sqlx::query_as(
            r#"
            SELECT id, name, exit_location_id, entry_location_id, created_at
            FROM sensors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Sensor>, DbError> {
        let rows: Vec<PgSensorRow> = sqlx::query_as(
            r#"
            SELECT id, name, exit_location_id, entry_location_id, created_at
            FROM sensors
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, update: &SensorUpdate) -> Result<Sensor, DbError> {
        let row: Option<PgSensorRow> = sqlx::query_as(
            r#"
            UPDATE sensors SET
                name = COALESCE($2, name),
                exit_location_id = COALESCE($3, exit_location_id),
                entry_location_id = COALESCE($4, entry_location_id)
            WHERE id = $1
            RETURNING id, name, exit_location_id, entry_location_id, created_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.exit_location_id)
        .bind(update.entry_location_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| DbError::not_found("Sensor", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sensors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_sensor_repository(pool: &DbPool) -> Box<dyn SensorRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteSensorRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgSensorRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SensorRow {
    id: String,
    name: String,
    exit_location_id: String,
    entry_location_id: String,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SensorRow> for Sensor {
    type Error = DbError;

    fn try_from(row: SensorRow) -> Result<Self, Self::Error> {
        Ok(Sensor {
            id: super::parse_uuid(&row.id)?,
            name: row.name,
            exit_location_id: super::parse_uuid(&row.exit_location_id)?,
            entry_location_id: super::parse_uuid(&row.entry_location_id)?,
            created_at: super::parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgSensorRow {
    id: Uuid,
    name: String,
    exit_location_id: Uuid,
    entry_location_id: Uuid,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgSensorRow> for Sensor {
    fn from(row: PgSensorRow) -> Self {
        Sensor {
            id: row.id,
            name: row.name,
            exit_location_id: row.exit_location_id,
            entry_location_id: row.entry_location_id,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_update_merges_unset_fields() {
        let exit = Uuid::new_v4();
        let entry = Uuid::new_v4();
        let sensor = Sensor::new("Door", exit, entry);

        let merged = SensorUpdate {
            entry_location_id: Some(exit),
            ..Default::default()
        }
        .apply_to(&sensor);

        assert_eq!(merged.name, "Door");
        assert_eq!(merged.id, sensor.id);
        assert!(!merged.has_distinct_sides());
    }

    #[cfg(feature = "database")]
    mod sqlite {
        use super::*;
        use crate::db::{
            create_location_repository, create_pool_with_options, run_migrations, PoolOptions,
        };
        use crate::location::Location;

        async fn setup() -> (DbPool, Location, Location) {
            let pool = create_pool_with_options(
                "sqlite::memory:",
                PoolOptions {
                    max_connections: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            run_migrations(&pool).await.unwrap();

            let locations = create_location_repository(&pool);
            let corridor = locations.create(&Location::new("Corridor")).await.unwrap();
            let lab = locations.create(&Location::new("Lab")).await.unwrap();
            (pool, corridor, lab)
        }

        #[tokio::test]
        async fn test_equal_sides_rejected_by_schema() {
            let (pool, corridor, _) = setup().await;
            let repo = create_sensor_repository(&pool);

            let result = repo
                .create(&Sensor::new("Loop", corridor.id, corridor.id))
                .await;
            assert!(matches!(result, Err(DbError::Constraint(_))));
            assert_eq!(repo.count().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_sensor_update_swaps_sides() {
            let (pool, corridor, lab) = setup().await;
            let repo = create_sensor_repository(&pool);

            let sensor = repo
                .create(&Sensor::new("Lab door", corridor.id, lab.id))
                .await
                .unwrap();
            let swapped = repo
                .update(
                    sensor.id,
                    &SensorUpdate {
                        exit_location_id: Some(lab.id),
                        entry_location_id: Some(corridor.id),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            assert_eq!(swapped.exit_location_id, lab.id);
            assert_eq!(swapped.entry_location_id, corridor.id);
            assert_eq!(swapped.name, "Lab door");
        }
    }
}
