use axum::Json;
use serde_json::{json, Value};

/// GET / - Service description and route map
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Timesheet API",
            "version": version,
            "description": "Clock-in/clock-out tracking with timesheet corrections and exports",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "clock": "POST /api/clock, GET /api/clock/status (protected)",
                "timesheets": "GET|PUT|DELETE /api/timesheets (protected)",
                "export": "POST /api/timesheets/export (protected)",
            }
        }
    }))
}
