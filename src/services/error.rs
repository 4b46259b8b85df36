use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::database::DatabaseError;

/// Domain errors raised by the clock, correction and timesheet services
#[derive(Debug, Error)]
pub enum TimesheetError {
    #[error("Already clocked in. Please clock out first.")]
    AlreadyClockedIn,

    #[error("Not currently clocked in")]
    NotClockedIn,

    #[error("Timesheet entry not found")]
    EntryNotFound,

    #[error("No valid updates provided")]
    NoValidUpdates,

    #[error("{0}")]
    InvalidUpdate(String),

    #[error("Clock-out time cannot be earlier than clock-in time")]
    NegativeDuration,

    #[error("A time entry already exists at {0}")]
    TimestampTaken(DateTime<Utc>),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type TimesheetResult<T> = Result<T, TimesheetError>;
