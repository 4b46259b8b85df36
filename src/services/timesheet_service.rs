use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::TimesheetResult;
use crate::database::{TimeEntry, TimeEntryStore};
use crate::types::{round_hours, DateRange, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// All entries of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub date: NaiveDate,
    pub entries: Vec<TimeEntry>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetSummary {
    pub days: Vec<DayGroup>,
    /// Exact sum of day totals; round at output
    pub total_hours: Decimal,
}

impl TimesheetSummary {
    /// Every entry in day order, each day's entries following the same order
    pub fn entries(&self) -> Vec<TimeEntry> {
        self.days.iter().flat_map(|d| d.entries.iter().cloned()).collect()
    }

    pub fn rounded_total(&self) -> Decimal {
        round_hours(self.total_hours)
    }
}

/// Partition entries by date. Only clock-out hours count toward totals.
pub fn group_by_day(entries: Vec<TimeEntry>, order: SortOrder) -> TimesheetSummary {
    let mut by_date: BTreeMap<NaiveDate, Vec<TimeEntry>> = BTreeMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry);
    }

    let mut days: Vec<DayGroup> = by_date
        .into_iter()
        .map(|(date, mut entries)| {
            entries.sort_by_key(|e| e.timestamp);
            let total_hours = entries.iter().filter(|e| e.is_clock_out()).map(|e| e.hours).sum();
            DayGroup {
                date,
                entries,
                total_hours,
            }
        })
        .collect();

    if order == SortOrder::Descending {
        days.reverse();
        for day in &mut days {
            day.entries.reverse();
        }
    }

    let total_hours = days.iter().map(|d| d.total_hours).sum();
    TimesheetSummary { days, total_hours }
}

/// Range and period queries over the entry log
#[derive(Clone)]
pub struct TimesheetService {
    entries: Arc<dyn TimeEntryStore>,
}

impl TimesheetService {
    pub fn new(entries: Arc<dyn TimeEntryStore>) -> Self {
        Self { entries }
    }

    pub async fn list_by_range(&self, user_id: &str, range: DateRange) -> TimesheetResult<Vec<TimeEntry>> {
        Ok(self.entries.list_entries(user_id, range).await?)
    }

    pub async fn list_by_period(
        &self,
        user_id: &str,
        period: Period,
        today: NaiveDate,
    ) -> TimesheetResult<(DateRange, Vec<TimeEntry>)> {
        let (start, end) = period.bounds(today);
        let range = DateRange::new(Some(start), Some(end));
        let entries = self.list_by_range(user_id, range).await?;
        Ok((range, entries))
    }

    pub async fn summarize(&self, user_id: &str, range: DateRange, order: SortOrder) -> TimesheetResult<TimesheetSummary> {
        let entries = self.list_by_range(user_id, range).await?;
        Ok(group_by_day(entries, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::testing::{at, fixture_day};
    use chrono::{DateTime, Duration, Utc};

    fn span(start: DateTime<Utc>, end: DateTime<Utc>, hours: Decimal) -> Vec<TimeEntry> {
        vec![
            TimeEntry::clock_in("u1", start),
            TimeEntry::clock_out("u1", end, hours, Some(start)),
        ]
    }

    fn working_day() -> Vec<TimeEntry> {
        let mut entries = span(at(9, 0), at(12, 30), Decimal::new(35, 1));
        entries.extend(span(at(13, 0), at(17, 15), Decimal::new(425, 2)));
        entries
    }

    #[test]
    fn day_total_sums_clock_out_hours() {
        let summary = group_by_day(working_day(), SortOrder::Ascending);

        assert_eq!(summary.days.len(), 1);
        assert_eq!(summary.days[0].total_hours, Decimal::new(775, 2));
        assert_eq!(summary.days[0].entries.len(), 4);
        assert_eq!(summary.total_hours, Decimal::new(775, 2));
    }

    #[test]
    fn grand_total_is_sum_of_days_in_either_order() {
        let mut entries = working_day();
        let tomorrow = at(9, 0) + Duration::days(1);
        entries.extend(span(tomorrow, tomorrow + Duration::hours(2), Decimal::from(2)));

        let asc = group_by_day(entries.clone(), SortOrder::Ascending);
        let desc = group_by_day(entries, SortOrder::Descending);

        assert_eq!(asc.total_hours, Decimal::new(975, 2));
        assert_eq!(desc.total_hours, asc.total_hours);
        assert_eq!(asc.days[0].date, fixture_day());
        assert_eq!(desc.days[0].date, fixture_day() + Duration::days(1));
        assert_eq!(desc.entries()[0].timestamp, tomorrow + Duration::hours(2));
    }

    #[tokio::test]
    async fn single_day_range_excludes_neighbours() {
        let store = Arc::new(MemoryStore::new());
        let mut entries = working_day();
        entries.extend(span(at(9, 0) - Duration::days(1), at(10, 0) - Duration::days(1), Decimal::ONE));
        entries.extend(span(at(9, 0) + Duration::days(1), at(10, 0) + Duration::days(1), Decimal::ONE));
        for entry in &entries {
            store.put_entry(entry).await.unwrap();
        }

        let service = TimesheetService::new(store);
        let found = service.list_by_range("u1", DateRange::single(fixture_day())).await.unwrap();

        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|e| e.date == fixture_day()));
    }

    #[tokio::test]
    async fn period_resolves_against_today() {
        let store = Arc::new(MemoryStore::new());
        for entry in working_day() {
            store.put_entry(&entry).await.unwrap();
        }

        let service = TimesheetService::new(store);
        let (range, entries) = service
            .list_by_period("u1", Period::ThisWeek, fixture_day())
            .await
            .unwrap();

        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 1, 13));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 1, 19));
        assert_eq!(entries.len(), 4);
    }
}
