use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{SessionStatus, TimeEntry};
use super::store::{SessionStore, StoreHealth, TimeEntryStore};
use crate::types::{ClockStatus, DateRange, EntryKind};

const ENTRY_COLUMNS: &str = "id, user_id, entry_time, entry_date, kind, hours, \
     paired_clock_in_time, description, project, last_modified";

/// Postgres-backed store for entries and sessions
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<TimeEntry, DatabaseError> {
    let kind: String = row.try_get("kind")?;
    let kind = kind.parse::<EntryKind>().map_err(DatabaseError::Corrupt)?;
    let hours: Decimal = row.try_get("hours")?;

    Ok(TimeEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        timestamp: row.try_get("entry_time")?,
        date: row.try_get("entry_date")?,
        kind,
        hours,
        paired_clock_in_timestamp: row.try_get("paired_clock_in_time")?,
        description: row.try_get("description")?,
        project: row.try_get("project")?,
        last_modified: row.try_get("last_modified")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<SessionStatus, DatabaseError> {
    let status: String = row.try_get("status")?;
    Ok(SessionStatus {
        user_id: row.try_get("user_id")?,
        status: status.parse::<ClockStatus>().map_err(DatabaseError::Corrupt)?,
        clock_in_time: row.try_get("clock_in_time")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn map_write_error(err: sqlx::Error, entry: &TimeEntry) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Conflict(format!(
            "an entry already exists at {}",
            entry.timestamp
        )),
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl TimeEntryStore for PgStore {
    async fn put_entry(&self, entry: &TimeEntry) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO time_entries ({ENTRY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, entry_time) DO UPDATE SET
                id = EXCLUDED.id,
                entry_date = EXCLUDED.entry_date,
                kind = EXCLUDED.kind,
                hours = EXCLUDED.hours,
                paired_clock_in_time = EXCLUDED.paired_clock_in_time,
                description = EXCLUDED.description,
                project = EXCLUDED.project,
                last_modified = EXCLUDED.last_modified
            "#
        );

        sqlx::query(&sql)
            .bind(entry.id)
            .bind(&entry.user_id)
            .bind(entry.timestamp)
            .bind(entry.date)
            .bind(entry.kind.as_str())
            .bind(entry.hours)
            .bind(entry.paired_clock_in_timestamp)
            .bind(&entry.description)
            .bind(&entry.project)
            .bind(entry.last_modified)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_entry(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>, DatabaseError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE user_id = $1 AND entry_time = $2");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(timestamp)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn delete_entry(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM time_entries WHERE user_id = $1 AND entry_time = $2")
            .bind(user_id)
            .bind(timestamp)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_entries(&self, user_id: &str, range: DateRange) -> Result<Vec<TimeEntry>, DatabaseError> {
        // NULL bounds are open
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM time_entries
            WHERE user_id = $1
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            ORDER BY entry_time ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn find_by_date_and_kind(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: EntryKind,
    ) -> Result<Vec<TimeEntry>, DatabaseError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries \
             WHERE user_id = $1 AND entry_date = $2 AND kind = $3 ORDER BY entry_time ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(date)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn replace_entry(&self, entry: &TimeEntry) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE time_entries SET
                entry_time = $3,
                entry_date = $4,
                kind = $5,
                hours = $6,
                paired_clock_in_time = $7,
                description = $8,
                project = $9,
                last_modified = $10
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(entry.timestamp)
        .bind(entry.date)
        .bind(entry.kind.as_str())
        .bind(entry.hours)
        .bind(entry.paired_clock_in_timestamp)
        .bind(&entry.description)
        .bind(&entry.project)
        .bind(entry.last_modified)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, entry))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn get_session(&self, user_id: &str) -> Result<Option<SessionStatus>, DatabaseError> {
        let row = sqlx::query(
            "SELECT user_id, status, clock_in_time, last_updated FROM user_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn put_session(&self, session: &SessionStatus) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (user_id, status, clock_in_time, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                status = EXCLUDED.status,
                clock_in_time = EXCLUDED.clock_in_time,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&session.user_id)
        .bind(session.status.as_str())
        .bind(session.clock_in_time)
        .bind(session.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
