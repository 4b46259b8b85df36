mod csv;
mod pdf;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::services::TimesheetSummary;
use crate::types::{round_hours, DateRange, ExportFormat};

pub use self::csv::render_csv;
pub use self::pdf::{render_pdf, PdfTable};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Export serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One exported line per calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub date: NaiveDate,
    pub clock_in_time: Option<DateTime<Utc>>,
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_hours: Decimal,
    pub description: String,
    pub project: String,
}

impl ExportRow {
    pub fn clock_in_label(&self) -> String {
        self.clock_in_time.map(time_label).unwrap_or_default()
    }

    pub fn clock_out_label(&self) -> String {
        self.clock_out_time.map(time_label).unwrap_or_default()
    }
}

fn time_label(t: DateTime<Utc>) -> String {
    t.format("%H:%M:%S").to_string()
}

pub fn hours_label(hours: Decimal) -> String {
    format!("{:.2}", round_hours(hours))
}

fn first_non_empty<'a>(values: impl Iterator<Item = Option<&'a String>>) -> String {
    values
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Collapse each day into its earliest clock-in, latest clock-out and the
/// first non-empty annotations
pub fn export_rows(summary: &TimesheetSummary) -> Vec<ExportRow> {
    summary
        .days
        .iter()
        .map(|day| {
            ExportRow {
                date: day.date,
                clock_in_time: day.entries.iter().filter(|e| e.is_clock_in()).map(|e| e.timestamp).min(),
                clock_out_time: day.entries.iter().filter(|e| e.is_clock_out()).map(|e| e.timestamp).max(),
                total_hours: day.total_hours,
                description: first_non_empty(day.entries.iter().map(|e| e.description.as_ref())),
                project: first_non_empty(day.entries.iter().map(|e| e.project.as_ref())),
            }
        })
        .collect()
}

/// Rendered export, ready to send
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub filename: String,
    pub body: Vec<u8>,
}

impl ExportFile {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn is_attachment(&self) -> bool {
        self.format != ExportFormat::Json
    }
}

pub fn render(
    format: ExportFormat,
    range: DateRange,
    summary: &TimesheetSummary,
    exported_at: DateTime<Utc>,
) -> Result<ExportFile, ExportError> {
    let rows = export_rows(summary);
    let total = summary.rounded_total();

    let body = match format {
        ExportFormat::Json => serde_json::to_vec(&json!({
            "entries": rows,
            "totalHours": total,
            "startDate": range.start,
            "endDate": range.end,
            "exportDate": exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }))?,
        ExportFormat::Csv => render_csv(&rows, total)?,
        ExportFormat::Pdf => {
            let title = format!("Timesheet Report: {}", range.to_string().replace('_', " "));
            render_pdf(&title, &rows, total)
        }
    };

    Ok(ExportFile {
        format,
        filename: format!("timesheet_{}.{}", range, format.extension()),
        body,
    })
}
