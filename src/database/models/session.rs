use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ClockStatus;

/// Current clock state of one user. A cache over the entry log, which stays
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub user_id: String,
    pub status: ClockStatus,
    pub clock_in_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl SessionStatus {
    pub fn clocked_in(user_id: impl Into<String>, clock_in_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            status: ClockStatus::ClockedIn,
            clock_in_time: Some(clock_in_time),
            last_updated: now,
        }
    }

    pub fn clocked_out(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            status: ClockStatus::ClockedOut,
            clock_in_time: None,
            last_updated: now,
        }
    }

    /// Clock-in instant, only when the record says the user is clocked in
    pub fn active_clock_in(&self) -> Option<DateTime<Utc>> {
        match self.status {
            ClockStatus::ClockedIn => self.clock_in_time,
            ClockStatus::ClockedOut => None,
        }
    }
}
