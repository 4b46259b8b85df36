use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::manager::DatabaseError;
use super::models::{SessionStatus, TimeEntry};
use crate::types::{DateRange, EntryKind};

/// Typed access to the time-entry log. All keys are partitioned by user.
#[async_trait]
pub trait TimeEntryStore: Send + Sync {
    /// Insert or overwrite the entry at `(user_id, timestamp)`
    async fn put_entry(&self, entry: &TimeEntry) -> Result<(), DatabaseError>;

    async fn get_entry(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>, DatabaseError>;

    /// Returns whether an entry was removed
    async fn delete_entry(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Entries whose date falls inside `range`, oldest first
    async fn list_entries(&self, user_id: &str, range: DateRange) -> Result<Vec<TimeEntry>, DatabaseError>;

    /// Secondary access path by (date, kind), oldest first
    async fn find_by_date_and_kind(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: EntryKind,
    ) -> Result<Vec<TimeEntry>, DatabaseError>;

    /// Replace the stored entry with the same `id` in a single operation,
    /// moving it to `entry.timestamp`. Fails with `Conflict` when another
    /// entry already occupies the new instant. Returns false when no entry
    /// with that id exists.
    async fn replace_entry(&self, entry: &TimeEntry) -> Result<bool, DatabaseError>;
}

/// Per-user session cache
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, user_id: &str) -> Result<Option<SessionStatus>, DatabaseError>;

    /// Unconditional overwrite, last writer wins
    async fn put_session(&self, session: &SessionStatus) -> Result<(), DatabaseError>;
}

/// Liveness probe for the backing store
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;
}
