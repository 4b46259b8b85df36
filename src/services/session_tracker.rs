use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::database::{DatabaseError, SessionStatus, SessionStore};
use crate::types::hours_between;

/// Reads and overwrites the per-user session record. Writes are
/// unconditional; an absent record means clocked out.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn SessionStore>,
}

/// Client view of the session record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub user_id: String,
    pub status: &'static str,
    pub is_clocked_in: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub clock_in_time: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub current_session_hours: Option<Decimal>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, user_id: &str) -> Result<Option<SessionStatus>, DatabaseError> {
        self.store.get_session(user_id).await
    }

    async fn set_status(&self, session: &SessionStatus) -> Result<(), DatabaseError> {
        self.store.put_session(session).await
    }

    pub async fn mark_clocked_in(
        &self,
        user_id: &str,
        clock_in_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SessionStatus, DatabaseError> {
        let session = SessionStatus::clocked_in(user_id, clock_in_time, now);
        self.set_status(&session).await?;
        Ok(session)
    }

    pub async fn mark_clocked_out(&self, user_id: &str, now: DateTime<Utc>) -> Result<SessionStatus, DatabaseError> {
        let session = SessionStatus::clocked_out(user_id, now);
        self.set_status(&session).await?;
        Ok(session)
    }

    /// Read-only status for the status endpoint; never repairs the record
    pub async fn report(&self, user_id: &str, now: DateTime<Utc>) -> Result<StatusReport, DatabaseError> {
        let session = self.get_status(user_id).await?;
        let clock_in_time = session.as_ref().and_then(SessionStatus::active_clock_in);
        let is_clocked_in = clock_in_time.is_some();

        Ok(StatusReport {
            user_id: user_id.to_string(),
            status: if is_clocked_in { "in" } else { "out" },
            is_clocked_in,
            last_updated: session.as_ref().map(|s| s.last_updated),
            clock_in_time: session.as_ref().and_then(|s| s.clock_in_time),
            current_session_hours: clock_in_time.map(|t| hours_between(t, now).max(Decimal::ZERO)),
        })
    }
}
