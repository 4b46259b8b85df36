/// Shared types used across the codebase

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of clock event recorded in the entry log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    ClockIn,
    ClockOut,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::ClockIn => "clock_in",
            EntryKind::ClockOut => "clock_out",
        }
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clock_in" => Ok(EntryKind::ClockIn),
            "clock_out" => Ok(EntryKind::ClockOut),
            other => Err(format!("unknown entry kind: {}", other)),
        }
    }
}

/// Cached clock state of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    ClockedIn,
    ClockedOut,
}

impl ClockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockStatus::ClockedIn => "clocked_in",
            ClockStatus::ClockedOut => "clocked_out",
        }
    }
}

impl FromStr for ClockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clocked_in" => Ok(ClockStatus::ClockedIn),
            "clocked_out" => Ok(ClockStatus::ClockedOut),
            other => Err(format!("unknown clock status: {}", other)),
        }
    }
}

/// Requested clock transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    In,
    Out,
}

impl FromStr for ClockAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" | "clock_in" => Ok(ClockAction::In),
            "out" | "clock_out" => Ok(ClockAction::Out),
            _ => Err(()),
        }
    }
}

/// Named reporting periods, resolved against the current UTC date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    ThisWeek,
    ThisMonth,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::ThisWeek => "this-week",
            Period::ThisMonth => "this-month",
        }
    }

    /// Inclusive (start, end) dates of the period containing `today`.
    /// Weeks run Monday through Sunday.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Today => (today, today),
            Period::ThisWeek => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            Period::ThisMonth => {
                let start = today.with_day(1).unwrap_or(today);
                let next_month = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
                };
                let end = next_month
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(today);
                (start, end)
            }
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Period::Today),
            "this-week" | "week" => Ok(Period::ThisWeek),
            "this-month" | "month" => Ok(Period::ThisMonth),
            other => Err(format!("Invalid period '{}'. Use today, this-week or this-month", other)),
        }
    }
}

/// Export renderings offered by the export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Json,
    #[default]
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("Unsupported export format '{}'. Use json, csv or pdf", other)),
        }
    }
}

/// Inclusive date filter; an absent bound is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(Some(day), Some(day))
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_bound = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "all".to_string());
        write!(f, "{}_to_{}", fmt_bound(self.start), fmt_bound(self.end))
    }
}

/// Round a decimal hour value to two places, half away from zero
pub fn round_hours(hours: Decimal) -> Decimal {
    hours.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Elapsed hours between two instants, rounded to two decimals
pub fn hours_between(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> Decimal {
    let millis = (end - start).num_milliseconds();
    round_hours(Decimal::from(millis) / Decimal::from(3_600_000))
}
