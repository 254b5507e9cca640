//! Database error types.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Query error: {0}")]
    Query(String),

    /// Record not found.
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Constraint violation (unique tag, referenced row, equal sensor sides).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The row changed between read and write (optimistic version check failed).
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Pool exhausted.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Invalid configuration.
    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

impl DbError {
    /// Builds a `NotFound` error for the given entity name and id.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "unknown".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if is_constraint_violation(&*db_err) {
                    DbError::Constraint(db_err.message().to_string())
                } else {
                    DbError::Query(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::Connection("connection pool closed".to_string()),
            sqlx::Error::Io(io_err) => DbError::Connection(io_err.to_string()),
            sqlx::Error::Configuration(msg) => DbError::Configuration(msg.to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

/// SQLite result codes for constraint failures: the primary
/// `SQLITE_CONSTRAINT` and its CHECK, FOREIGNKEY, PRIMARYKEY and UNIQUE
/// extended codes.
#[cfg(feature = "database")]
const SQLITE_CONSTRAINT_CODES: [&str; 5] = ["19", "275", "787", "1555", "2067"];

/// Returns true for unique, foreign-key and check violations.
///
/// SQLite foreign-key failures are not always classified by sqlx's error
/// kind, so the SQLite result code and message are checked as well.
#[cfg(feature = "database")]
fn is_constraint_violation(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    if db_err.is_unique_violation()
        || db_err.is_foreign_key_violation()
        || db_err.is_check_violation()
    {
        return true;
    }
    if db_err
        .code()
        .is_some_and(|code| SQLITE_CONSTRAINT_CODES.contains(&code.as_ref()))
    {
        return true;
    }
    db_err.message().contains("constraint failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = DbError::not_found("Asset", "abc");
        assert_eq!(err.to_string(), "Record not found: Asset with id abc");
    }

    #[cfg(feature = "database")]
    #[tokio::test]
    async fn test_sqlite_foreign_key_failure_is_constraint() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in [
            "PRAGMA foreign_keys = ON",
            "CREATE TABLE rooms (id TEXT PRIMARY KEY)",
            "CREATE TABLE items (id TEXT PRIMARY KEY, \
             room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE RESTRICT)",
            "INSERT INTO rooms (id) VALUES ('lab')",
            "INSERT INTO items (id, room_id) VALUES ('scope', 'lab')",
        ] {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }

        let err: DbError = sqlx::query("DELETE FROM rooms WHERE id = 'lab'")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");

        let err: DbError = sqlx::query("INSERT INTO items (id, room_id) VALUES ('x', 'nowhere')")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
    }

    #[test]
    fn test_conflict_display() {
        let err = DbError::Conflict("asset 1 changed".to_string());
        assert!(err.to_string().contains("asset 1 changed"));
    }
}
