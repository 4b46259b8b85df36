use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::now;
use crate::app::AppState;
use crate::database::TimeEntry;
use crate::error::ApiError;
use crate::export;
use crate::middleware::{ApiResponse, ApiResult, Attachment, AuthUser, JsonBody};
use crate::services::{group_by_day, parse_hours, parse_updates, Correction, DayGroup, RetimeRequest, SortOrder};
use crate::types::{DateRange, ExportFormat, Period};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetListing {
    pub timesheets: Vec<DayGroup>,
    pub entries: Vec<TimeEntry>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_hours: Decimal,
    pub period: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {} '{}'. Use YYYY-MM-DD", field, v))),
    }
}

fn date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, ApiError> {
    let range = DateRange::new(parse_date("start_date", start)?, parse_date("end_date", end)?);
    if let (Some(s), Some(e)) = (range.start, range.end) {
        if e < s {
            return Err(ApiError::bad_request("end_date cannot be before start_date"));
        }
    }
    Ok(range)
}

/// GET /api/timesheets - Entries grouped by day, newest first
///
/// Query: `start_date`/`end_date` (YYYY-MM-DD, either optional) or
/// `period` = today | this-week | this-month. A complete date pair wins over
/// a period.
pub async fn list_timesheets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Option<Query<ListQuery>>,
) -> ApiResult<TimesheetListing> {
    let query = query.map(|Query(q)| q).unwrap_or_default();

    let has_both_dates = [&query.start_date, &query.end_date]
        .iter()
        .all(|d| d.as_deref().is_some_and(|v| !v.trim().is_empty()));
    let period = query.period.as_deref().filter(|p| !p.is_empty() && !has_both_dates);

    let (label, range, entries) = match period {
        Some(p) => {
            let period = p.parse::<Period>().map_err(ApiError::bad_request)?;
            let (range, entries) = state
                .timesheets
                .list_by_period(&user.user_id, period, now().date_naive())
                .await?;
            (period.as_str().to_string(), range, entries)
        }
        None => {
            let range = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
            let entries = state.timesheets.list_by_range(&user.user_id, range).await?;
            ("custom".to_string(), range, entries)
        }
    };

    let summary = group_by_day(entries, SortOrder::Descending);
    let entries = summary.entries();
    let total_hours = summary.rounded_total();

    Ok(ApiResponse::success(TimesheetListing {
        timesheets: summary.days,
        entries,
        total_hours,
        period: label,
        start_date: range.start,
        end_date: range.end,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub timestamp: Option<DateTime<Utc>>,
    pub updates: Option<Map<String, Value>>,
    pub clock_in_timestamp: Option<DateTime<Utc>>,
    pub clock_out_timestamp: Option<DateTime<Utc>>,
    pub hours: Option<Value>,
}

impl UpdateRequest {
    /// An `updates` map selects a field edit; otherwise the time fields
    /// describe a retiming
    fn correction(&self) -> Result<Correction, ApiError> {
        if let Some(updates) = &self.updates {
            return Ok(Correction::Fields(parse_updates(updates)?));
        }

        let hours = match &self.hours {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_hours(value)?),
        };

        Ok(Correction::Retime(RetimeRequest {
            clock_in: self.clock_in_timestamp,
            clock_out: self.clock_out_timestamp,
            hours,
        }))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub updated_entry: TimeEntry,
}

/// PUT /api/timesheets - Correct one entry
///
/// Field edit: `{"timestamp": "...", "updates": {"hours": 7.5, "description": "..."}}`
/// Retiming: `{"timestamp": "...", "clock_in_timestamp": "...", "clock_out_timestamp": "..."}`
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdateRequest>,
) -> ApiResult<UpdateResponse> {
    let timestamp = body
        .timestamp
        .ok_or_else(|| ApiError::bad_request("timestamp is required for PUT requests"))?;
    let correction = body.correction()?;

    let updated = state
        .corrections
        .apply(&user.user_id, timestamp, correction, now())
        .await?;

    Ok(ApiResponse::success(UpdateResponse {
        success: true,
        message: "Time entry updated successfully",
        updated_entry: updated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

/// DELETE /api/timesheets - Remove one entry by its timestamp
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<DeleteRequest>,
) -> ApiResult<DeleteResponse> {
    let timestamp = body
        .timestamp
        .ok_or_else(|| ApiError::bad_request("timestamp is required for DELETE requests"))?;

    state.corrections.delete_entry(&user.user_id, timestamp, now()).await?;

    Ok(ApiResponse::success(DeleteResponse {
        success: true,
        message: "Time entry deleted successfully",
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    pub format: Option<String>,
}

/// POST /api/timesheets/export - Render a range as JSON, CSV or PDF
///
/// CSV and PDF are sent as attachments named `timesheet_<start>_to_<end>.<ext>`.
pub async fn export_timesheets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<ExportRequest>,
) -> Result<Response, ApiError> {
    let format = match body.format.as_deref() {
        None | Some("") => ExportFormat::default(),
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::bad_request)?,
    };
    let range = date_range(body.start_date.as_deref(), body.end_date.as_deref())?;

    let summary = state
        .timesheets
        .summarize(&user.user_id, range, SortOrder::Ascending)
        .await?;
    let file = export::render(format, range, &summary, now())?;

    tracing::info!(
        "Exported {} day(s) for {} as {}",
        summary.days.len(),
        user.user_id,
        format.extension()
    );

    if !file.is_attachment() {
        return Ok((
            [(axum::http::header::CONTENT_TYPE, file.content_type())],
            file.body,
        )
            .into_response());
    }

    Ok(Attachment {
        content_type: file.content_type(),
        filename: file.filename,
        body: file.body,
    }
    .into_response())
}
