use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::database::{DatabaseError, MemoryStore, SessionStatus, SessionStore, TimeEntry, TimeEntryStore};
use crate::types::{DateRange, EntryKind};

/// Instant on the fixture day (2025-01-15, a Wednesday)
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0).unwrap()
}

pub fn fixture_day() -> NaiveDate {
    at(0, 0).date_naive()
}

fn injected(what: &str) -> DatabaseError {
    DatabaseError::Unavailable(format!("injected {} failure", what))
}

/// In-memory store with switchable failures, for exercising degraded and
/// interrupted paths
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_session_reads: AtomicBool,
    pub fail_session_writes: AtomicBool,
    pub fail_entry_writes: AtomicBool,
    /// 1-based index of the `replace_entry` call that fails; 0 never fails
    pub fail_replace_call: AtomicUsize,
    replace_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_session_reads(&self, on: bool) {
        self.fail_session_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_session_writes(&self, on: bool) {
        self.fail_session_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_entry_writes(&self, on: bool) {
        self.fail_entry_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_nth_replace(&self, n: usize) {
        self.replace_calls.store(0, Ordering::SeqCst);
        self.fail_replace_call.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimeEntryStore for FlakyStore {
    async fn put_entry(&self, entry: &TimeEntry) -> Result<(), DatabaseError> {
        if self.fail_entry_writes.load(Ordering::SeqCst) {
            return Err(injected("entry write"));
        }
        self.inner.put_entry(entry).await
    }

    async fn get_entry(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<Option<TimeEntry>, DatabaseError> {
        self.inner.get_entry(user_id, timestamp).await
    }

    async fn delete_entry(&self, user_id: &str, timestamp: DateTime<Utc>) -> Result<bool, DatabaseError> {
        if self.fail_entry_writes.load(Ordering::SeqCst) {
            return Err(injected("entry delete"));
        }
        self.inner.delete_entry(user_id, timestamp).await
    }

    async fn list_entries(&self, user_id: &str, range: DateRange) -> Result<Vec<TimeEntry>, DatabaseError> {
        self.inner.list_entries(user_id, range).await
    }

    async fn find_by_date_and_kind(
        &self,
        user_id: &str,
        date: NaiveDate,
        kind: EntryKind,
    ) -> Result<Vec<TimeEntry>, DatabaseError> {
        self.inner.find_by_date_and_kind(user_id, date, kind).await
    }

    async fn replace_entry(&self, entry: &TimeEntry) -> Result<bool, DatabaseError> {
        let call = self.replace_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_replace_call.load(Ordering::SeqCst) {
            return Err(injected("entry replace"));
        }
        self.inner.replace_entry(entry).await
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get_session(&self, user_id: &str) -> Result<Option<SessionStatus>, DatabaseError> {
        if self.fail_session_reads.load(Ordering::SeqCst) {
            return Err(injected("session read"));
        }
        self.inner.get_session(user_id).await
    }

    async fn put_session(&self, session: &SessionStatus) -> Result<(), DatabaseError> {
        if self.fail_session_writes.load(Ordering::SeqCst) {
            return Err(injected("session write"));
        }
        self.inner.put_session(session).await
    }
}
