//! Movement repository: the append-only movement log and the atomic commit
//! that moves an asset.

use super::{DbError, DbPool};
use crate::movement::MovementRecord;
#[cfg(feature = "database")]
use crate::movement::TransitionKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Filter for listing movements.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Only movements of this asset.
    pub asset_id: Option<Uuid>,
    /// Only movements detected by this sensor.
    pub sensor_id: Option<Uuid>,
}

/// A movement together with the asset version it was decided against.
///
/// Committing applies the movement's destination and timestamp to the asset
/// and appends the record, but only while the asset is still at
/// `expected_version`.
#[derive(Debug, Clone)]
pub struct MovementCommit {
    pub record: MovementRecord,
    pub expected_version: i64,
}

/// Repository trait for movement persistence.
#[async_trait]
pub trait MovementRepository: Send + Sync {
    /// Atomically moves the asset and appends the movement record.
    ///
    /// Sets the asset's current location to `record.to_location_id`, its
    /// `last_seen_at` to `record.occurred_at` and bumps its version, then
    /// inserts the record. Returns `DbError::Conflict` and changes nothing if
    /// the asset's version no longer matches `expected_version`.
    async fn record(&self, commit: &MovementCommit) -> Result<MovementRecord, DbError>;

    /// Lists movements ordered by detection time, ties in insertion order.
    async fn list(&self, filter: &MovementFilter) -> Result<Vec<MovementRecord>, DbError>;

    /// Lists the movement history of one asset, oldest first.
    async fn list_for_asset(&self, asset_id: Uuid) -> Result<Vec<MovementRecord>, DbError> {
        self.list(&MovementFilter {
            asset_id: Some(asset_id),
            ..Default::default()
        })
        .await
    }

    /// Gets the most recent movement of an asset.
    async fn latest_for_asset(&self, asset_id: Uuid) -> Result<Option<MovementRecord>, DbError>;

    /// Counts all movements.
    async fn count(&self) -> Result<i64, DbError>;

    /// Counts movements that occurred at or after `since`.
    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DbError>;
}

/// SQLite implementation of MovementRepository.
#[cfg(feature = "database")]
pub struct SqliteMovementRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteMovementRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl MovementRepository for SqliteMovementRepository {
    async fn record(&self, commit: &MovementCommit) -> Result<MovementRecord, DbError> {
        let record = &commit.record;
        let asset_id = record.asset_id.to_string();
        let occurred_at = super::format_timestamp(&record.occurred_at);

        let mut tx = self.pool.begin().await?;

        // The write comes first so the transaction takes the write lock
        // up front instead of upgrading from a read snapshot.
        let moved = sqlx::query(
            r#"
            UPDATE assets SET
                current_location_id = ?,
                last_seen_at = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(record.to_location_id.to_string())
        .bind(&occurred_at)
        .bind(&asset_id)
        .bind(commit.expected_version)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::Conflict(format!(
                "asset {} is no longer at version {}",
                record.asset_id, commit.expected_version
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO movements (id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&asset_id)
        .bind(record.from_location_id.to_string())
        .bind(record.to_location_id.to_string())
        .bind(record.sensor_id.to_string())
        .bind(record.kind.as_db_str())
        .bind(&occurred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record.clone())
    }

    async fn list(&self, filter: &MovementFilter) -> Result<Vec<MovementRecord>, DbError> {
        let mut query = String::from(
            "SELECT id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at FROM movements WHERE 1=1",
        );
        let mut params: Vec<String> = Vec::new();

        if let Some(asset_id) = &filter.asset_id {
            query.push_str(" AND asset_id = ?");
            params.push(asset_id.to_string());
        }

        if let Some(sensor_id) = &filter.sensor_id {
            query.push_str(" AND sensor_id = ?");
            params.push(sensor_id.to_string());
        }

        query.push_str(" ORDER BY occurred_at ASC, rowid ASC");

        let mut sqlx_query = sqlx::query_as::<_, MovementRow>(&query);
        for param in &params {
            sqlx_query = sqlx_query.bind(param);
        }

        let rows: Vec<MovementRow> = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn latest_for_asset(&self, asset_id: Uuid) -> Result<Option<MovementRecord>, DbError> {
        let row: Option<MovementRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at
            FROM movements
            WHERE asset_id = ?
            ORDER BY occurred_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE occurred_at >= ?")
            .bind(super::format_timestamp(&since))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// PostgreSQL implementation of MovementRepository.
#[cfg(feature = "database")]
pub struct PgMovementRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgMovementRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl MovementRepository for PgMovementRepository {
    async fn record(&self, commit: &MovementCommit) -> Result<MovementRecord, DbError> {
        let record = &commit.record;
        let mut tx = self.pool.begin().await?;

        // A concurrent writer holding the row makes this wait, then re-check
        // the version against the committed row.
        let moved = sqlx::query(
            r#"
            UPDATE assets SET
                current_location_id = $1,
                last_seen_at = $2,
                version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(record.to_location_id)
        .bind(record.occurred_at)
        .bind(record.asset_id)
        .bind(commit.expected_version)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::Conflict(format!(
                "asset {} is no longer at version {}",
                record.asset_id, commit.expected_version
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO movements (id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.asset_id)
        .bind(record.from_location_id)
        .bind(record.to_location_id)
        .bind(record.sensor_id)
        .bind(record.kind.as_db_str())
        .bind(record.occurred_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record.clone())
    }

    async fn list(&self, filter: &MovementFilter) -> Result<Vec<MovementRecord>, DbError> {
        let rows: Vec<PgMovementRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at
            FROM movements
            WHERE ($1::uuid IS NULL OR asset_id = $1)
              AND ($2::uuid IS NULL OR sensor_id = $2)
            ORDER BY occurred_at ASC, seq ASC
            "#,
        )
        .bind(filter.asset_id)
        .bind(filter.sensor_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn latest_for_asset(&self, asset_id: Uuid) -> Result<Option<MovementRecord>, DbError> {
        let row: Option<PgMovementRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, from_location_id, to_location_id, sensor_id, kind, occurred_at
            FROM movements
            WHERE asset_id = $1
            ORDER BY occurred_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE occurred_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_movement_repository(pool: &DbPool) -> Box<dyn MovementRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteMovementRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgMovementRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
fn parse_kind(kind: &str) -> Result<TransitionKind, DbError> {
    TransitionKind::from_db_str(kind)
        .ok_or_else(|| DbError::Serialization(format!("Unknown movement kind: {}", kind)))
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct MovementRow {
    id: String,
    asset_id: String,
    from_location_id: String,
    to_location_id: String,
    sensor_id: String,
    kind: String,
    occurred_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<MovementRow> for MovementRecord {
    type Error = DbError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(MovementRecord {
            id: super::parse_uuid(&row.id)?,
            asset_id: super::parse_uuid(&row.asset_id)?,
            from_location_id: super::parse_uuid(&row.from_location_id)?,
            to_location_id: super::parse_uuid(&row.to_location_id)?,
            sensor_id: super::parse_uuid(&row.sensor_id)?,
            kind: parse_kind(&row.kind)?,
            occurred_at: super::parse_timestamp(&row.occurred_at)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgMovementRow {
    id: Uuid,
    asset_id: Uuid,
    from_location_id: Uuid,
    to_location_id: Uuid,
    sensor_id: Uuid,
    kind: String,
    occurred_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl TryFrom<PgMovementRow> for MovementRecord {
    type Error = DbError;

    fn try_from(row: PgMovementRow) -> Result<Self, Self::Error> {
        Ok(MovementRecord {
            id: row.id,
            asset_id: row.asset_id,
            from_location_id: row.from_location_id,
            to_location_id: row.to_location_id,
            sensor_id: row.sensor_id,
            kind: parse_kind(&row.kind)?,
            occurred_at: row.occurred_at,
        })
    }
}
