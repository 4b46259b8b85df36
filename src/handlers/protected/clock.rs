use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::now;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::StatusReport;
use crate::types::ClockAction;

#[derive(Debug, Deserialize)]
pub struct ClockRequest {
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    pub hours: Option<Decimal>,
}

/// POST /api/clock - Clock in or out
///
/// Body: `{"action": "in" | "out"}`
///
/// ```json
/// { "success": true, "message": "Clocked out successfully",
///   "timestamp": "2025-01-15T12:30:00Z", "hours": 3.5 }
/// ```
pub async fn clock_action(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<ClockRequest>,
) -> ApiResult<ClockResponse> {
    let action = body
        .action
        .as_deref()
        .and_then(|a| a.parse::<ClockAction>().ok())
        .ok_or_else(|| ApiError::bad_request("Invalid action. Use \"in\" or \"out\""))?;

    let outcome = state.clock.transition(&user.user_id, action, now()).await?;

    let message = match outcome.action {
        ClockAction::In => "Clocked in successfully",
        ClockAction::Out => "Clocked out successfully",
    };

    Ok(ApiResponse::success(ClockResponse {
        success: true,
        message,
        timestamp: outcome.timestamp,
        hours: outcome.hours,
    }))
}

/// GET /api/clock/status - Current clock state; read-only
pub async fn clock_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<StatusReport> {
    let report = state.sessions.report(&user.user_id, now()).await?;
    Ok(ApiResponse::success(report))
}
