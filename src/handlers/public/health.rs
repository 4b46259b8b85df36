use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /health - Store liveness; 503 when the store cannot be reached
pub async fn health(State(state): State<AppState>) -> Response {
    match state.health.ping().await {
        Ok(()) => Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": chrono::Utc::now(),
                "database": "ok"
            }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            ApiError::service_unavailable("database unavailable").into_response()
        }
    }
}
