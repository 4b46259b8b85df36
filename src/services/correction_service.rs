use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{TimesheetError, TimesheetResult};
use super::session_tracker::SessionTracker;
use crate::database::{DatabaseError, EntryPatch, TimeEntry, TimeEntryStore};
use crate::types::{hours_between, round_hours, DateRange, EntryKind};

/// New endpoints for a historical span. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetimeRequest {
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub hours: Option<Decimal>,
}

impl RetimeRequest {
    pub fn is_empty(&self) -> bool {
        self.clock_in.is_none() && self.clock_out.is_none() && self.hours.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Correction {
    Fields(EntryPatch),
    Retime(RetimeRequest),
}

/// Parse a client `updates` map. Unknown keys are ignored.
pub fn parse_updates(updates: &Map<String, Value>) -> TimesheetResult<EntryPatch> {
    let mut patch = EntryPatch::default();

    if let Some(value) = updates.get("hours") {
        patch.hours = Some(parse_hours(value)?);
    }
    if let Some(value) = updates.get("description") {
        patch.description = Some(parse_annotation("description", value)?);
    }
    if let Some(value) = updates.get("project") {
        patch.project = Some(parse_annotation("project", value)?);
    }

    if patch.is_empty() {
        return Err(TimesheetError::NoValidUpdates);
    }
    Ok(patch)
}

pub fn parse_hours(value: &Value) -> TimesheetResult<Decimal> {
    let invalid = || TimesheetError::InvalidUpdate("hours must be a non-negative number".to_string());

    let hours = value.as_f64().and_then(Decimal::from_f64).ok_or_else(invalid)?;
    if hours < Decimal::ZERO {
        return Err(invalid());
    }
    Ok(round_hours(hours))
}

fn parse_annotation(field: &str, value: &Value) -> TimesheetResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(TimesheetError::InvalidUpdate(format!("{} must be a string", field))),
    }
}

fn occupied(err: DatabaseError, timestamp: DateTime<Utc>) -> TimesheetError {
    match err {
        DatabaseError::Conflict(_) => TimesheetError::TimestampTaken(timestamp),
        other => TimesheetError::Database(other),
    }
}

/// Edits, retimes and deletes historical entries
#[derive(Clone)]
pub struct CorrectionService {
    entries: Arc<dyn TimeEntryStore>,
    sessions: SessionTracker,
}

impl CorrectionService {
    pub fn new(entries: Arc<dyn TimeEntryStore>, sessions: SessionTracker) -> Self {
        Self { entries, sessions }
    }

    pub async fn apply(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        correction: Correction,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        match correction {
            Correction::Fields(patch) => self.edit_fields(user_id, timestamp, &patch, now).await,
            Correction::Retime(request) => self.retime(user_id, timestamp, &request, now).await,
        }
    }

    pub async fn edit_fields(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        patch: &EntryPatch,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        if patch.is_empty() {
            return Err(TimesheetError::NoValidUpdates);
        }

        let mut entry = self
            .entries
            .get_entry(user_id, timestamp)
            .await?
            .ok_or(TimesheetError::EntryNotFound)?;

        if patch.hours.is_some() && entry.is_clock_in() {
            return Err(TimesheetError::InvalidUpdate(
                "hours can only be set on clock-out entries".to_string(),
            ));
        }

        patch.apply(&mut entry, now);
        self.entries.put_entry(&entry).await?;

        info!("Updated time entry {} for {}", timestamp, user_id);
        Ok(entry)
    }

    /// Move a span's endpoints. Each entry moves in one store operation; the
    /// two-entry case is not atomic but repeating the same request after a
    /// partial failure completes it.
    pub async fn retime(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        request: &RetimeRequest,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        if request.is_empty() {
            return Err(TimesheetError::NoValidUpdates);
        }
        if matches!(request.hours, Some(h) if h < Decimal::ZERO) {
            return Err(TimesheetError::InvalidUpdate("hours must be a non-negative number".to_string()));
        }

        match self.entries.get_entry(user_id, timestamp).await? {
            Some(entry) if entry.is_clock_out() => self.retime_clock_out(entry, request, now).await,
            Some(entry) => self.retime_clock_in(entry, request, now).await,
            None => self
                .already_applied(user_id, timestamp, request, now)
                .await?
                .ok_or(TimesheetError::EntryNotFound),
        }
    }

    /// Looks for the target where a previous identical request would have
    /// moved it, finishing any step that did not land. Only entries that were
    /// themselves retimed count; an untouched entry at the requested instant
    /// means the target never existed.
    async fn already_applied(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        request: &RetimeRequest,
        now: DateTime<Utc>,
    ) -> TimesheetResult<Option<TimeEntry>> {
        if let Some(new_out) = request.clock_out {
            let moved = self
                .entries
                .get_entry(user_id, new_out)
                .await?
                .filter(|e| e.is_clock_out() && e.last_modified.is_some())
                .filter(|e| request.clock_in.map_or(true, |t| e.paired_clock_in_timestamp == Some(t)));
            return Ok(moved);
        }

        if let Some(new_in) = request.clock_in {
            let moved = self
                .entries
                .get_entry(user_id, new_in)
                .await?
                .filter(|e| e.is_clock_in() && e.last_modified.is_some());
            if let Some(entry) = moved {
                self.repair_pairing(user_id, timestamp, new_in, now).await?;
                self.follow_session(user_id, timestamp, new_in, now).await?;
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn retime_clock_out(
        &self,
        target: TimeEntry,
        request: &RetimeRequest,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        let user_id = target.user_id.clone();

        let clock_in = match request.clock_in {
            Some(new_in) => self.locate_clock_in(&target, new_in).await?,
            None => None,
        };

        let effective_in = request.clock_in.or(target.paired_clock_in_timestamp);
        let effective_out = request.clock_out.unwrap_or(target.timestamp);

        if let Some(t_in) = effective_in {
            if effective_out < t_in {
                return Err(TimesheetError::NegativeDuration);
            }
        }

        // Reject occupied instants before the first write
        if let (Some(new_in), Some(entry)) = (request.clock_in, clock_in.as_ref()) {
            self.ensure_free(&user_id, new_in, &[entry.id]).await?;
        }
        if let Some(new_out) = request.clock_out {
            let movable: Vec<_> = std::iter::once(target.id).chain(clock_in.as_ref().map(|e| e.id)).collect();
            self.ensure_free(&user_id, new_out, &movable).await?;
        }

        if let (Some(new_in), Some(entry)) = (request.clock_in, clock_in.as_ref()) {
            if entry.timestamp != new_in {
                self.move_entry(&entry.retimed(new_in, now)).await?;
                self.follow_session(&user_id, entry.timestamp, new_in, now).await?;
            }
        } else if let Some(new_in) = request.clock_in {
            warn!("No clock-in entry found for {} near {}; only updating pairing", user_id, new_in);
        }

        let mut updated = target.retimed(effective_out, now);
        if request.clock_in.is_some() {
            updated.paired_clock_in_timestamp = request.clock_in;
        }
        updated.hours = match effective_in {
            Some(t_in) => hours_between(t_in, effective_out),
            None => request.hours.unwrap_or(target.hours),
        };

        self.move_entry(&updated).await?;

        info!(
            "Retimed clock-out {} -> {} for {} ({} hours)",
            target.timestamp, updated.timestamp, user_id, updated.hours
        );
        Ok(updated)
    }

    async fn retime_clock_in(
        &self,
        target: TimeEntry,
        request: &RetimeRequest,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        let Some(new_in) = request.clock_in else {
            return Err(TimesheetError::InvalidUpdate(
                "clock_in_timestamp is required to retime a clock-in entry".to_string(),
            ));
        };
        let user_id = target.user_id.clone();

        if let Some(out) = self.closing_clock_out(&user_id, &target).await? {
            if out.timestamp < new_in {
                return Err(TimesheetError::NegativeDuration);
            }
        }
        self.ensure_free(&user_id, new_in, &[target.id]).await?;

        let moved = target.retimed(new_in, now);
        if target.timestamp != new_in {
            self.move_entry(&moved).await?;
        }
        self.repair_pairing(&user_id, target.timestamp, new_in, now).await?;
        self.follow_session(&user_id, target.timestamp, new_in, now).await?;

        info!("Retimed clock-in {} -> {} for {}", target.timestamp, new_in, user_id);
        Ok(moved)
    }

    /// Remove one entry. Removing the clock-in the session points at clocks
    /// the user out.
    pub async fn delete_entry(
        &self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TimesheetResult<TimeEntry> {
        let entry = self
            .entries
            .get_entry(user_id, timestamp)
            .await?
            .ok_or(TimesheetError::EntryNotFound)?;

        if !self.entries.delete_entry(user_id, timestamp).await? {
            return Err(TimesheetError::EntryNotFound);
        }
        info!("Deleted {} entry {} for {}", entry.kind.as_str(), timestamp, user_id);

        if entry.is_clock_in() {
            match self.sessions.get_status(user_id).await {
                Ok(Some(session)) if session.active_clock_in() == Some(timestamp) => {
                    self.sessions.mark_clocked_out(user_id, now).await?;
                }
                Ok(_) => {}
                Err(e) => warn!("Session check after deleting {} failed for {}: {}", timestamp, user_id, e),
            }
        }

        Ok(entry)
    }

    /// Clock-in a clock-out belongs to: its pairing, then whatever already
    /// sits at the requested instant, then a scan of the clock-out's day.
    async fn locate_clock_in(&self, clock_out: &TimeEntry, new_in: DateTime<Utc>) -> TimesheetResult<Option<TimeEntry>> {
        let user_id = clock_out.user_id.as_str();

        if let Some(paired) = clock_out.paired_clock_in_timestamp {
            if let Some(entry) = self.entries.get_entry(user_id, paired).await? {
                if entry.is_clock_in() {
                    return Ok(Some(entry));
                }
            }
        }

        if let Some(entry) = self.entries.get_entry(user_id, new_in).await? {
            if entry.is_clock_in() {
                return Ok(Some(entry));
            }
        }

        let clock_ins = self
            .entries
            .find_by_date_and_kind(user_id, clock_out.date, EntryKind::ClockIn)
            .await?;
        let clock_outs = self
            .entries
            .find_by_date_and_kind(user_id, clock_out.date, EntryKind::ClockOut)
            .await?;
        let referenced = |c: &TimeEntry| {
            clock_outs
                .iter()
                .any(|o| o.id != clock_out.id && o.paired_clock_in_timestamp == Some(c.timestamp))
        };

        let unreferenced = clock_ins
            .iter()
            .filter(|c| !referenced(c) && c.timestamp <= clock_out.timestamp)
            .max_by_key(|c| c.timestamp);
        Ok(unreferenced.or_else(|| clock_ins.first()).cloned())
    }

    /// Clock-out whose pairing names `clock_in`, searched on its day and the next
    async fn closing_clock_out(&self, user_id: &str, clock_in: &TimeEntry) -> TimesheetResult<Option<TimeEntry>> {
        let range = DateRange::new(Some(clock_in.date), Some(clock_in.date + Duration::days(1)));
        let entries = self.entries.list_entries(user_id, range).await?;
        Ok(entries
            .into_iter()
            .find(|e| e.is_clock_out() && e.paired_clock_in_timestamp == Some(clock_in.timestamp)))
    }

    /// Point the clock-out paired with `old_in` at `new_in` and recompute it
    async fn repair_pairing(
        &self,
        user_id: &str,
        old_in: DateTime<Utc>,
        new_in: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TimesheetResult<()> {
        if old_in == new_in {
            return Ok(());
        }
        let range = DateRange::new(Some(old_in.date_naive()), Some(old_in.date_naive() + Duration::days(1)));
        let entries = self.entries.list_entries(user_id, range).await?;

        for out in entries
            .into_iter()
            .filter(|e| e.is_clock_out() && e.paired_clock_in_timestamp == Some(old_in))
        {
            let mut repaired = out.retimed(out.timestamp, now);
            repaired.paired_clock_in_timestamp = Some(new_in);
            repaired.hours = hours_between(new_in, out.timestamp).max(Decimal::ZERO);
            self.move_entry(&repaired).await?;
        }
        Ok(())
    }

    async fn follow_session(
        &self,
        user_id: &str,
        old_in: DateTime<Utc>,
        new_in: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TimesheetResult<()> {
        let session = self.sessions.get_status(user_id).await?;
        if session.and_then(|s| s.active_clock_in()) == Some(old_in) {
            self.sessions.mark_clocked_in(user_id, new_in, now).await?;
        }
        Ok(())
    }

    async fn ensure_free(&self, user_id: &str, at: DateTime<Utc>, movable: &[uuid::Uuid]) -> TimesheetResult<()> {
        match self.entries.get_entry(user_id, at).await? {
            Some(existing) if !movable.contains(&existing.id) => Err(TimesheetError::TimestampTaken(at)),
            _ => Ok(()),
        }
    }

    async fn move_entry(&self, entry: &TimeEntry) -> TimesheetResult<()> {
        match self.entries.replace_entry(entry).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(TimesheetError::EntryNotFound),
            Err(e) => Err(occupied(e, entry.timestamp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, SessionStore};
    use crate::testing::{at, FlakyStore};
    use serde_json::json;

    async fn seed_span(store: &MemoryStore, start: DateTime<Utc>, end: DateTime<Utc>) {
        store.put_entry(&TimeEntry::clock_in("u1", start)).await.unwrap();
        store
            .put_entry(&TimeEntry::clock_out("u1", end, hours_between(start, end), Some(start)))
            .await
            .unwrap();
    }

    fn service(store: &Arc<MemoryStore>) -> CorrectionService {
        CorrectionService::new(store.clone(), SessionTracker::new(store.clone()))
    }

    fn updates(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parse_updates_ignores_unknown_keys() {
        let patch = parse_updates(&updates(json!({"hours": 7.5, "colour": "red"}))).unwrap();
        assert_eq!(patch.hours, Some(Decimal::new(75, 1)));
        assert_eq!(patch.description, None);

        let err = parse_updates(&updates(json!({"colour": "red"}))).unwrap_err();
        assert!(matches!(err, TimesheetError::NoValidUpdates));
    }

    #[test]
    fn parse_updates_validates_values() {
        assert!(matches!(
            parse_updates(&updates(json!({"hours": -1}))),
            Err(TimesheetError::InvalidUpdate(_))
        ));
        assert!(matches!(
            parse_updates(&updates(json!({"hours": "three"}))),
            Err(TimesheetError::InvalidUpdate(_))
        ));
        assert!(matches!(
            parse_updates(&updates(json!({"project": 12}))),
            Err(TimesheetError::InvalidUpdate(_))
        ));

        let patch = parse_updates(&updates(json!({"description": null}))).unwrap();
        assert_eq!(patch.description, Some(None));
    }

    #[tokio::test]
    async fn field_edit_stamps_last_modified() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(12, 0)).await;

        let patch = parse_updates(&updates(json!({"hours": 2.75, "project": "billing"}))).unwrap();
        let edited = service(&store).edit_fields("u1", at(12, 0), &patch, at(18, 0)).await.unwrap();

        assert_eq!(edited.hours, Decimal::new(275, 2));
        assert_eq!(edited.project.as_deref(), Some("billing"));
        assert_eq!(edited.last_modified, Some(at(18, 0)));
        assert_eq!(store.get_entry("u1", at(12, 0)).await.unwrap().unwrap(), edited);
    }

    #[tokio::test]
    async fn field_edit_refuses_hours_on_clock_in() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(12, 0)).await;

        let patch = EntryPatch {
            hours: Some(Decimal::ONE),
            ..Default::default()
        };
        let err = service(&store).edit_fields("u1", at(9, 0), &patch, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let patch = EntryPatch {
            description: Some(Some("x".into())),
            ..Default::default()
        };
        let err = service(&store).edit_fields("u1", at(9, 0), &patch, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::EntryNotFound));
    }

    #[tokio::test]
    async fn retiming_clock_out_recomputes_hours_over_caller_value() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;

        let request = RetimeRequest {
            clock_out: Some(at(12, 0)),
            hours: Some(Decimal::from(10)),
            ..Default::default()
        };
        let updated = service(&store).retime("u1", at(11, 0), &request, at(18, 0)).await.unwrap();

        assert_eq!(updated.timestamp, at(12, 0));
        assert_eq!(updated.hours, Decimal::from(3));
        assert!(store.get_entry("u1", at(11, 0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retiming_both_ends_moves_the_clock_in() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        let clock_in_id = store.get_entry("u1", at(9, 0)).await.unwrap().unwrap().id;

        let request = RetimeRequest {
            clock_in: Some(at(8, 0)),
            clock_out: Some(at(12, 0)),
            hours: None,
        };
        let updated = service(&store).retime("u1", at(11, 0), &request, at(18, 0)).await.unwrap();

        assert_eq!(updated.paired_clock_in_timestamp, Some(at(8, 0)));
        assert_eq!(updated.hours, Decimal::from(4));
        let moved = store.get_entry("u1", at(8, 0)).await.unwrap().unwrap();
        assert_eq!(moved.id, clock_in_id);
        assert_eq!(store.all_entries("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn retiming_rejects_negative_span_without_writing() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        let before = store.all_entries("u1").await;

        let request = RetimeRequest {
            clock_in: Some(at(13, 0)),
            ..Default::default()
        };
        let err = service(&store).retime("u1", at(11, 0), &request, at(18, 0)).await.unwrap_err();

        assert!(matches!(err, TimesheetError::NegativeDuration));
        assert_eq!(store.all_entries("u1").await, before);
    }

    #[tokio::test]
    async fn retiming_onto_an_occupied_instant_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        seed_span(&store, at(13, 0), at(15, 0)).await;

        let request = RetimeRequest {
            clock_out: Some(at(13, 0)),
            ..Default::default()
        };
        let err = service(&store).retime("u1", at(11, 0), &request, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::TimestampTaken(t) if t == at(13, 0)));
    }

    #[tokio::test]
    async fn retiming_clock_in_repairs_its_clock_out_and_session() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        store.put_entry(&TimeEntry::clock_in("u1", at(13, 0))).await.unwrap();
        SessionTracker::new(store.clone())
            .mark_clocked_in("u1", at(13, 0), at(13, 0))
            .await
            .unwrap();
        let corrections = service(&store);

        let request = RetimeRequest {
            clock_in: Some(at(8, 30)),
            ..Default::default()
        };
        corrections.retime("u1", at(9, 0), &request, at(18, 0)).await.unwrap();
        let out = store.get_entry("u1", at(11, 0)).await.unwrap().unwrap();
        assert_eq!(out.paired_clock_in_timestamp, Some(at(8, 30)));
        assert_eq!(out.hours, Decimal::new(250, 2));

        let request = RetimeRequest {
            clock_in: Some(at(12, 45)),
            ..Default::default()
        };
        corrections.retime("u1", at(13, 0), &request, at(18, 0)).await.unwrap();
        let session = store.get_session("u1").await.unwrap().unwrap();
        assert_eq!(session.active_clock_in(), Some(at(12, 45)));
    }

    #[tokio::test]
    async fn interrupted_retiming_converges_on_retry() {
        let store = Arc::new(FlakyStore::new());
        store.inner.put_entry(&TimeEntry::clock_in("u1", at(9, 0))).await.unwrap();
        store
            .inner
            .put_entry(&TimeEntry::clock_out("u1", at(11, 0), Decimal::from(2), Some(at(9, 0))))
            .await
            .unwrap();
        let corrections = CorrectionService::new(store.clone(), SessionTracker::new(store.clone()));

        let request = RetimeRequest {
            clock_in: Some(at(8, 0)),
            clock_out: Some(at(12, 0)),
            hours: None,
        };

        // Clock-in moves, clock-out write fails
        store.fail_nth_replace(2);
        let err = corrections.retime("u1", at(11, 0), &request, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::Database(_)));
        assert!(store.inner.get_entry("u1", at(8, 0)).await.unwrap().is_some());
        assert!(store.inner.get_entry("u1", at(11, 0)).await.unwrap().is_some());

        let retried = corrections.retime("u1", at(11, 0), &request, at(18, 5)).await.unwrap();
        assert_eq!(retried.timestamp, at(12, 0));
        assert_eq!(retried.hours, Decimal::from(4));
        assert_eq!(retried.paired_clock_in_timestamp, Some(at(8, 0)));

        // A further identical request finds the finished result
        let again = corrections.retime("u1", at(11, 0), &request, at(18, 10)).await.unwrap();
        assert_eq!(again, retried);
        assert_eq!(store.inner.all_entries("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn retiming_an_unknown_timestamp_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        let corrections = service(&store);

        let onto_clock_out = RetimeRequest {
            clock_out: Some(at(11, 0)),
            ..Default::default()
        };
        let err = corrections.retime("u1", at(7, 0), &onto_clock_out, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::EntryNotFound));

        let onto_clock_in = RetimeRequest {
            clock_in: Some(at(9, 0)),
            ..Default::default()
        };
        let err = corrections.retime("u1", at(7, 0), &onto_clock_in, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::EntryNotFound));

        let paired_elsewhere = RetimeRequest {
            clock_in: Some(at(8, 0)),
            clock_out: Some(at(11, 0)),
            hours: None,
        };
        let err = corrections.retime("u1", at(7, 0), &paired_elsewhere, at(18, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::EntryNotFound));
    }

    #[tokio::test]
    async fn repeating_a_clock_in_retime_returns_the_moved_entry() {
        let store = Arc::new(MemoryStore::new());
        seed_span(&store, at(9, 0), at(11, 0)).await;
        let corrections = service(&store);

        let request = RetimeRequest {
            clock_in: Some(at(8, 30)),
            ..Default::default()
        };
        let moved = corrections.retime("u1", at(9, 0), &request, at(18, 0)).await.unwrap();
        let again = corrections.retime("u1", at(9, 0), &request, at(18, 5)).await.unwrap();

        assert_eq!(again.id, moved.id);
        assert_eq!(again.timestamp, at(8, 30));
    }

    #[tokio::test]
    async fn deleting_active_clock_in_clocks_out() {
        let store = Arc::new(MemoryStore::new());
        store.put_entry(&TimeEntry::clock_in("u1", at(9, 0))).await.unwrap();
        SessionTracker::new(store.clone())
            .mark_clocked_in("u1", at(9, 0), at(9, 0))
            .await
            .unwrap();

        let deleted = service(&store).delete_entry("u1", at(9, 0), at(10, 0)).await.unwrap();
        assert_eq!(deleted.kind, EntryKind::ClockIn);
        assert!(store.all_entries("u1").await.is_empty());
        let session = store.get_session("u1").await.unwrap().unwrap();
        assert_eq!(session.active_clock_in(), None);

        let err = service(&store).delete_entry("u1", at(9, 0), at(10, 0)).await.unwrap_err();
        assert!(matches!(err, TimesheetError::EntryNotFound));
    }
}
