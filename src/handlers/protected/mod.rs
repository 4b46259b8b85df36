// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Security Level: verified token; `AuthUser` is present in request extensions
// Route Prefix: /api/*
pub mod clock; // Clock transitions and status
pub mod timesheets; // Listing, corrections and exports

use chrono::{DateTime, SubsecRound, Utc};

/// Server-side "now", truncated to millisecond precision
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
