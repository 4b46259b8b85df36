use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{TimesheetError, TimesheetResult};
use super::session_tracker::SessionTracker;
use crate::database::{TimeEntry, TimeEntryStore};
use crate::types::{hours_between, ClockAction, DateRange, EntryKind};

/// Result of a successful clock transition
#[derive(Debug, Clone, PartialEq)]
pub struct ClockOutcome {
    pub action: ClockAction,
    pub timestamp: DateTime<Utc>,
    pub hours: Option<Decimal>,
    /// Clock-in instant the transition closed (clock-out only)
    pub clock_in_time: Option<DateTime<Utc>>,
}

/// Clock-in / clock-out state machine over the entry log and session cache.
/// The entry log is authoritative; the session record is repaired from it
/// when the two disagree.
#[derive(Clone)]
pub struct ClockService {
    entries: Arc<dyn TimeEntryStore>,
    sessions: SessionTracker,
}

impl ClockService {
    pub fn new(entries: Arc<dyn TimeEntryStore>, sessions: SessionTracker) -> Self {
        Self { entries, sessions }
    }

    pub async fn transition(&self, user_id: &str, action: ClockAction, now: DateTime<Utc>) -> TimesheetResult<ClockOutcome> {
        match action {
            ClockAction::In => self.clock_in(user_id, now).await,
            ClockAction::Out => self.clock_out(user_id, now).await,
        }
    }

    pub async fn clock_in(&self, user_id: &str, now: DateTime<Utc>) -> TimesheetResult<ClockOutcome> {
        // Best effort: a failed status read must not block clocking in
        match self.sessions.get_status(user_id).await {
            Ok(Some(session)) if session.active_clock_in().is_some() => {
                return Err(TimesheetError::AlreadyClockedIn);
            }
            Ok(_) => {}
            Err(e) => warn!("Session check failed for {}, proceeding with clock-in: {}", user_id, e),
        }

        let entry = TimeEntry::clock_in(user_id, now);
        self.entries.put_entry(&entry).await?;
        self.sessions.mark_clocked_in(user_id, now, now).await?;

        info!("User {} clocked in at {}", user_id, now);
        Ok(ClockOutcome {
            action: ClockAction::In,
            timestamp: now,
            hours: None,
            clock_in_time: None,
        })
    }

    pub async fn clock_out(&self, user_id: &str, now: DateTime<Utc>) -> TimesheetResult<ClockOutcome> {
        let session = self.sessions.get_status(user_id).await?;

        let clock_in_time = match session.as_ref().and_then(|s| s.active_clock_in()) {
            Some(t) => t,
            None => self.reconcile(user_id, now).await?.ok_or(TimesheetError::NotClockedIn)?,
        };

        // The session can lag the log when its last write failed
        if let Some(closed) = self.closing_clock_out(user_id, clock_in_time, now).await? {
            warn!(
                "Clock-in {} for {} was already closed at {}; repairing session",
                clock_in_time, user_id, closed.timestamp
            );
            self.sessions.mark_clocked_out(user_id, now).await?;
            return Ok(ClockOutcome {
                action: ClockAction::Out,
                timestamp: closed.timestamp,
                hours: Some(closed.hours),
                clock_in_time: Some(clock_in_time),
            });
        }

        let mut hours = hours_between(clock_in_time, now);
        if hours < Decimal::ZERO {
            warn!("Clock-in {} for {} is after clock-out {}; recording zero hours", clock_in_time, user_id, now);
            hours = Decimal::ZERO;
        }

        let entry = TimeEntry::clock_out(user_id, now, hours, Some(clock_in_time));
        self.entries.put_entry(&entry).await?;
        self.sessions.mark_clocked_out(user_id, now).await?;

        info!("User {} clocked out at {} ({} hours)", user_id, now, hours);
        Ok(ClockOutcome {
            action: ClockAction::Out,
            timestamp: now,
            hours: Some(hours),
            clock_in_time: Some(clock_in_time),
        })
    }

    /// Clock-out already recorded against `clock_in_time`, if any
    async fn closing_clock_out(
        &self,
        user_id: &str,
        clock_in_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TimesheetResult<Option<TimeEntry>> {
        let first = clock_in_time.date_naive();
        let range = DateRange::new(Some(first), Some(now.date_naive().max(first)));
        let entries = self.entries.list_entries(user_id, range).await?;
        Ok(entries
            .into_iter()
            .find(|e| e.is_clock_out() && e.paired_clock_in_timestamp == Some(clock_in_time)))
    }

    /// Stale-session recovery: adopt the latest unclosed clock-in of today
    /// from the entry log and rewrite the session record to match. Returns
    /// the adopted instant, or None when nothing is open.
    pub async fn reconcile(&self, user_id: &str, now: DateTime<Utc>) -> TimesheetResult<Option<DateTime<Utc>>> {
        let open = self.find_unclosed_clock_in(user_id, now.date_naive(), now).await?;
        let Some(open) = open else {
            return Ok(None);
        };

        warn!(
            "Session for {} was not clocked in; recovered open clock-in at {}",
            user_id, open.timestamp
        );
        self.sessions.mark_clocked_in(user_id, open.timestamp, now).await?;
        Ok(Some(open.timestamp))
    }

    /// Latest clock-in on `date`, at or before `now`, that no clock-out closes.
    /// A clock-out closes the clock-in it names; one without a pairing closes
    /// the latest still-open clock-in before it.
    pub async fn find_unclosed_clock_in(
        &self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> TimesheetResult<Option<TimeEntry>> {
        let clock_ins = self.entries.find_by_date_and_kind(user_id, date, EntryKind::ClockIn).await?;
        if clock_ins.is_empty() {
            return Ok(None);
        }
        let clock_outs = self.entries.find_by_date_and_kind(user_id, date, EntryKind::ClockOut).await?;

        let mut closed: HashSet<DateTime<Utc>> = clock_outs
            .iter()
            .filter_map(|e| e.paired_clock_in_timestamp)
            .collect();

        let mut unpaired: Vec<&TimeEntry> = clock_outs
            .iter()
            .filter(|e| e.paired_clock_in_timestamp.is_none())
            .collect();
        unpaired.sort_by_key(|e| e.timestamp);

        for out in unpaired {
            let latest_open = clock_ins
                .iter()
                .filter(|c| c.timestamp <= out.timestamp && !closed.contains(&c.timestamp))
                .max_by_key(|c| c.timestamp);
            if let Some(c) = latest_open {
                closed.insert(c.timestamp);
            }
        }

        Ok(clock_ins
            .into_iter()
            .filter(|c| c.timestamp <= now && !closed.contains(&c.timestamp))
            .max_by_key(|c| c.timestamp))
    }
}
