use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EntryKind;

/// A single clock event. `(user_id, timestamp)` is the external identity;
/// `id` stays stable when the entry is retimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub hours: Decimal,
    pub paired_clock_in_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl TimeEntry {
    pub fn clock_in(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timestamp,
            date: timestamp.date_naive(),
            kind: EntryKind::ClockIn,
            hours: Decimal::ZERO,
            paired_clock_in_timestamp: None,
            description: None,
            project: None,
            last_modified: None,
        }
    }

    pub fn clock_out(
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        hours: Decimal,
        paired_clock_in_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            kind: EntryKind::ClockOut,
            hours,
            paired_clock_in_timestamp,
            ..Self::clock_in(user_id, timestamp)
        }
    }

    pub fn is_clock_in(&self) -> bool {
        self.kind == EntryKind::ClockIn
    }

    pub fn is_clock_out(&self) -> bool {
        self.kind == EntryKind::ClockOut
    }

    /// Copy of this entry moved to a new instant; the date follows the instant
    pub fn retimed(&self, timestamp: DateTime<Utc>, modified_at: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            date: timestamp.date_naive(),
            last_modified: Some(modified_at),
            ..self.clone()
        }
    }
}

/// In-place edit of non-key attributes. `Some(None)` clears an annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub hours: Option<Decimal>,
    pub description: Option<Option<String>>,
    pub project: Option<Option<String>>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.hours.is_none() && self.description.is_none() && self.project.is_none()
    }

    pub fn apply(&self, entry: &mut TimeEntry, modified_at: DateTime<Utc>) {
        if let Some(hours) = self.hours {
            entry.hours = hours;
        }
        if let Some(description) = &self.description {
            entry.description = description.clone();
        }
        if let Some(project) = &self.project {
            entry.project = project.clone();
        }
        entry.last_modified = Some(modified_at);
    }
}
