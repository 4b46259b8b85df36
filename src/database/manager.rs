use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Schema for the entry log and the per-user session cache. Every statement
/// is idempotent so it can run on each startup.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS time_entries (
        id UUID PRIMARY KEY,
        user_id TEXT NOT NULL,
        entry_time TIMESTAMPTZ NOT NULL,
        entry_date DATE NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('clock_in', 'clock_out')),
        hours NUMERIC(10, 2) NOT NULL DEFAULT 0 CHECK (hours >= 0),
        paired_clock_in_time TIMESTAMPTZ,
        description TEXT,
        project TEXT,
        last_modified TIMESTAMPTZ,
        UNIQUE (user_id, entry_time)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS time_entries_user_date_kind ON time_entries (user_id, entry_date, kind)",
    r#"
    CREATE TABLE IF NOT EXISTS user_sessions (
        user_id TEXT PRIMARY KEY,
        status TEXT NOT NULL CHECK (status IN ('clocked_in', 'clocked_out')),
        clock_in_time TIMESTAMPTZ,
        last_updated TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Connection and schema management for the Postgres store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against `DATABASE_URL`
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max_connections={})", config.max_connections);
        Ok(pool)
    }

    /// Create tables and indexes if missing
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(pool).await?;
        }
        info!("Applied {} schema statements", MIGRATIONS.len());
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
