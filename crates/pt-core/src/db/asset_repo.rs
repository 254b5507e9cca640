//! Asset repository for database operations.
//!
//! Location changes never go through this repository: they are committed by
//! [`MovementRepository::record`](super::MovementRepository::record) together
//! with the movement they produce.

use super::{DbError, DbPool};
use crate::asset::Asset;
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Partial update for an asset. Only the display name is mutable.
#[derive(Debug, Clone, Default)]
pub struct AssetUpdate {
    /// New name for the asset.
    pub name: Option<String>,
}

/// Repository trait for asset persistence.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Creates a new asset. Fails with `Constraint` on a duplicate tag or an
    /// unknown initial location.
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError>;

    /// Gets an asset by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError>;

    /// Gets an asset by its external tag.
    async fn get_by_tag(&self, external_tag: &str) -> Result<Option<Asset>, DbError>;

    /// Lists all assets in insertion order.
    async fn list(&self) -> Result<Vec<Asset>, DbError>;

    /// Updates an asset, bumping its version.
    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError>;

    /// Deletes an asset together with its movement history.
    async fn delete(&self, id: Uuid) -> Result<bool, DbError>;

    /// Counts all assets.
    async fn count(&self) -> Result<i64, DbError>;
}

#[cfg(feature = "database")]
const SQLITE_COLUMNS: &str =
    "id, external_tag, name, current_location_id, last_seen_at, version, created_at";

/// SQLite implementation of AssetRepository.
#[cfg(feature = "database")]
pub struct SqliteAssetRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteAssetRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssetRepository for SqliteAssetRepository {
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, external_tag, name, current_location_id, last_seen_at, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.to_string())
        .bind(&asset.external_tag)
        .bind(&asset.name)
        .bind(asset.current_location_id.to_string())
        .bind(super::format_timestamp(&asset.last_seen_at))
        .bind(asset.version)
        .bind(super::format_timestamp(&asset.created_at))
        .execute(&self.pool)
        .await?;

        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError> {
        let row: Option<AssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE id = ?",
            SQLITE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_tag(&self, external_tag: &str) -> Result<Option<Asset>, DbError> {
        let row: Option<AssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE external_tag = ?",
            SQLITE_COLUMNS
        ))
        .bind(external_tag)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Asset>, DbError> {
        let rows: Vec<AssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets ORDER BY rowid ASC",
            SQLITE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError> {
        let result = sqlx::query(
            "UPDATE assets SET name = COALESCE(?, name), version = version + 1 WHERE id = ?",
        )
        .bind(&update.name)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Asset", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// PostgreSQL implementation of AssetRepository.
#[cfg(feature = "database")]
pub struct PgAssetRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgAssetRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AssetRepository for PgAssetRepository {
    async fn create(&self, asset: &Asset) -> Result<Asset, DbError> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, external_tag, name, current_location_id, last_seen_at, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(asset.id)
        .bind(&asset.external_tag)
        .bind(&asset.name)
        .bind(asset.current_location_id)
        .bind(asset.last_seen_at)
        .bind(asset.version)
        .bind(asset.created_at)
        .execute(&self.pool)
        .await?;

        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, DbError> {
        let row: Option<PgAssetRow> = sqlx::query_as(
            r#"
            SELECT id, external_tag, name, current_location_id, last_seen_at, version, created_at
            FROM assets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_tag(&self, external_tag: &str) -> Result<Option<Asset>, DbError> {
        let row: Option<PgAssetRow> = sqlx::query_as(
            r#"
            SELECT id, external_tag, name, current_location_id, last_seen_at, version, created_at
            FROM assets
            WHERE external_tag = $1
            "#,
        )
        .bind(external_tag)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Asset>, DbError> {
        let rows: Vec<PgAssetRow> = sqlx::query_as(
            r#"
            SELECT id, external_tag, name, current_location_id, last_seen_at, version, created_at
            FROM assets
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, update: &AssetUpdate) -> Result<Asset, DbError> {
        let row: Option<PgAssetRow> = sqlx::query_as(
            r#"
            UPDATE assets SET
                name = COALESCE($2, name),
                version = version + 1
            WHERE id = $1
            RETURNING id, external_tag, name, current_location_id, last_seen_at, version, created_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| DbError::not_found("Asset", id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_asset_repository(pool: &DbPool) -> Box<dyn AssetRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteAssetRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgAssetRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct AssetRow {
    id: String,
    external_tag: String,
    name: String,
    current_location_id: String,
    last_seen_at: String,
    version: i64,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<AssetRow> for Asset {
    type Error = DbError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: super::parse_uuid(&row.id)?,
            external_tag: row.external_tag,
            name: row.name,
            current_location_id: super::parse_uuid(&row.current_location_id)?,
            last_seen_at: super::parse_timestamp(&row.last_seen_at)?,
            version: row.version,
            created_at: super::parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAssetRow {
    id: Uuid,
    external_tag: String,
    name: String,
    current_location_id: Uuid,
    last_seen_at: DateTime<Utc>,
    version: i64,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgAssetRow> for Asset {
    fn from(row: PgAssetRow) -> Self {
        Asset {
            id: row.id,
            external_tag: row.external_tag,
            name: row.name,
            current_location_id: row.current_location_id,
            last_seen_at: row.last_seen_at,
            version: row.version,
            created_at: row.created_at,
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use crate::db::{
        create_location_repository, create_pool_with_options, run_migrations, PoolOptions,
    };
    use crate::location::Location;

    async fn setup() -> (DbPool, Location) {
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

        let location = create_location_repository(&pool)
            .create(&Location::new("Storage"))
            .await
            .unwrap();
        (pool, location)
    }

    #[tokio::test]
    async fn test_asset_roundtrip_and_lookup_by_tag() {
        let (pool, storage) = setup().await;
        let repo = create_asset_repository(&pool);

        let asset = Asset::new("E200-0001", "Projector", storage.id, Utc::now());
        repo.create(&asset).await.unwrap();

        let by_tag = repo.get_by_tag("E200-0001").await.unwrap().unwrap();
        assert_eq!(by_tag.id, asset.id);
        assert_eq!(by_tag.current_location_id, storage.id);
        assert_eq!(by_tag.version, 0);
        assert!(repo.get_by_tag("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tag_is_constraint_violation() {
        let (pool, storage) = setup().await;
        let repo = create_asset_repository(&pool);

        repo.create(&Asset::new("TAG-1", "Laptop", storage.id, Utc::now()))
            .await
            .unwrap();
        let result = repo
            .create(&Asset::new("TAG-1", "Other laptop", storage.id, Utc::now()))
            .await;

        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_location_is_constraint_violation() {
        let (pool, _) = setup().await;
        let repo = create_asset_repository(&pool);

        let result = repo
            .create(&Asset::new("TAG-2", "Chair", Uuid::new_v4(), Utc::now()))
            .await;
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_update_changes_name_and_bumps_version() {
        let (pool, storage) = setup().await;
        let repo = create_asset_repository(&pool);

        let asset = repo
            .create(&Asset::new("TAG-3", "Desk", storage.id, Utc::now()))
            .await
            .unwrap();
        let updated = repo
            .update(
                asset.id,
                &AssetUpdate {
                    name: Some("Standing desk".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Standing desk");
        assert_eq!(updated.external_tag, "TAG-3");
        assert_eq!(updated.current_location_id, storage.id);
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_referenced_location_cannot_be_deleted() {
        let (pool, storage) = setup().await;
        let repo = create_asset_repository(&pool);
        repo.create(&Asset::new("TAG-4", "Monitor", storage.id, Utc::now()))
            .await
            .unwrap();

        let result = create_location_repository(&pool).delete(storage.id).await;
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
