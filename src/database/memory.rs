use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{SessionStatus, TimeEntry};
use super::store::{SessionStore, StoreHealth, TimeEntryStore};
use crate::types::{DateRange, EntryKind};

type UserEntries = BTreeMap<DateTime<Utc>, TimeEntry>;

/// Process-local store used for tests and `STORE_BACKEND=memory`
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, UserEntries>>>,
    sessions: Arc<RwLock<HashMap<String, SessionStatus>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry of a user, oldest first
    pub async fn all_entries(&self, user_id: &str) -> Vec<TimeEntry> {
        let entries = self.entries.read().await;
        entries
            .get(user_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TimeEntryStore for MemoryStore {
    async fn put_entry(&self, entry: &TimeEntry) -> Result<(), DatabaseError> {
        let mut entries = self.entries.write().await;
        entries
            .entry(entry.user_id.clone())
            .or_default()
            .insert(entry.timestamp, entry.clone());
        Ok(())
    }

    async fn get_entry(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>, DatabaseError> {
        let entries = self.entries.read().await;
        Ok(entries.get(user_id).and_then(|m| m.get(&timestamp)).cloned())
    }

    async fn delete_entry(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(user_id)
            .and_then(|m| m.remove(&timestamp))
            .is_some())
    }

    async fn list_entries(&self, user_id: &str, range: DateRange) -> Result<Vec<TimeEntry>, DatabaseError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(user_id)
            .map(|m| m.values().filter(|e| range.contains(e.date)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_date_and_kind(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: EntryKind,
    ) -> Result<Vec<TimeEntry>, DatabaseError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(user_id)
            .map(|m| {
                m.values()
                    .filter(|e| e.date == date && e.kind == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_entry(&self, entry: &TimeEntry) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().await;
        let Some(user_entries) = entries.get_mut(&entry.user_id) else {
            return Ok(false);
        };

        let Some(old_timestamp) = user_entries
            .values()
            .find(|e| e.id == entry.id)
            .map(|e| e.timestamp)
        else {
            return Ok(false);
        };

        if old_timestamp != entry.timestamp && user_entries.contains_key(&entry.timestamp) {
            return Err(DatabaseError::Conflict(format!(
                "an entry already exists at {}",
                entry.timestamp
            )));
        }

        user_entries.remove(&old_timestamp);
        user_entries.insert(entry.timestamp, entry.clone());
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, user_id: &str) -> Result<Option<SessionStatus>, DatabaseError> {
        Ok(self.sessions.read().await.get(user_id).cloned())
    }

    async fn put_session(&self, session: &SessionStatus) -> Result<(), DatabaseError> {
        self.sessions
            .write()
            .await
            .insert(session.user_id.clone(), session.clone());
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
