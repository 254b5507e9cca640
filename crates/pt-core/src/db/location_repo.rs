//! Location repository for database operations.

use super::{DbError, DbPool};
use crate::location::Location;
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Partial update for a location.
#[derive(Debug, Clone, Default)]
pub struct LocationUpdate {
    /// New name for the location.
    pub name: Option<String>,
}

/// Repository trait for location persistence.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Creates a new location.
    async fn create(&self, location: &Location) -> Result<Location, DbError>;

    /// Gets a location by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Location>, DbError>;

    /// Lists all locations in insertion order.
    async fn list(&self) -> Result<Vec<Location>, DbError>;

    /// Updates a location.
    async fn update(&self, id: Uuid, update: &LocationUpdate) -> Result<Location, DbError>;

    /// Deletes a location. Fails with `Constraint` while any asset, sensor or
    /// movement still references it.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Counts all locations.
    async fn count(&self) -> Result<i64, DbError>;
}

/// SQLite implementation of LocationRepository.
#[cfg(feature = "database")]
pub struct SqliteLocationRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteLocationRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl LocationRepository for SqliteLocationRepository {
    async fn create(&self, location: &Location) -> Result<Location, DbError> {
        sqlx::query("INSERT INTO locations (id, name, created_at) VALUES (?, ?, ?)")
            .bind(location.id.to_string())
            .bind(&location.name)
            .bind(super::format_timestamp(&location.created_at))
            .execute(&self.pool)
            .await?;

        Ok(location.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Location>, DbError> {
        let row: Option<LocationRow> =
            sqlx::query_as("SELECT id, name, created_at FROM locations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Location>, DbError> {
        let rows: Vec<LocationRow> =
            sqlx::query_as("SELECT id, name, created_at FROM locations ORDER BY rowid ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn update(&self, id: Uuid, update: &LocationUpdate) -> Result<Location, DbError> {
        let result = sqlx::query("UPDATE locations SET name = COALESCE(?, name) WHERE id = ?")
            .bind(&update.name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Location", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// PostgreSQL implementation of LocationRepository.
#[cfg(feature = "database")]
pub struct PgLocationRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgLocationRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn create(&self, location: &Location) -> Result<Location, DbError> {
        sqlx::query("INSERT INTO locations (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(location.id)
            .bind(&location.name)
            .bind(location.created_at)
            .execute(&self.pool)
            .await?;

        Ok(location.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Location>, DbError> {
        let row: Option<PgLocationRow> =
            sqlx::query_as("SELECT id, name, created_at FROM locations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Location>, DbError> {
        let rows: Vec<PgLocationRow> =
            sqlx::query_as("SELECT id, name, created_at FROM locations ORDER BY seq ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, update: &LocationUpdate) -> Result<Location, DbError> {
        let row: Option<PgLocationRow> = sqlx::query_as(
            r#"
            UPDATE locations SET name = COALESCE($2, name)
            WHERE id = $1
            RETURNING id, name, created_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| DbError::not_found("Location", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_location_repository(pool: &DbPool) -> Box<dyn LocationRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteLocationRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgLocationRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct LocationRow {
    id: String,
    name: String,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<LocationRow> for Location {
    type Error = DbError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Location {
            id: super::parse_uuid(&row.id)?,
            name: row.name,
            created_at: super::parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgLocationRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgLocationRow> for Location {
    fn from(row: PgLocationRow) -> Self {
        Location {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use crate::db::{create_pool_with_options, run_migrations, PoolOptions};

    async fn setup() -> DbPool {
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
        pool
    }

    #[tokio::test]
    async fn test_location_crud() {
        let pool = setup().await;
        let repo = create_location_repository(&pool);

        let lab = repo.create(&Location::new("Lab 1")).await.unwrap();
        let hall = repo.create(&Location::new("Hall")).await.unwrap();

        let fetched = repo.get(lab.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Lab 1");

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Lab 1", "Hall"]);

        let renamed = repo
            .update(
                hall.id,
                &LocationUpdate {
                    name: Some("Main hall".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Main hall");

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.delete(lab.id).await.unwrap());
        assert!(!repo.delete(lab.id).await.unwrap());
        assert!(repo.get(lab.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_location() {
        let pool = setup().await;
        let repo = create_location_repository(&pool);

        let result = repo
            .update(Uuid::new_v4(), &LocationUpdate::default())
            .await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }
}
