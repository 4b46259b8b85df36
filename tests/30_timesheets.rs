mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use common::{at, TestApp};
use timesheet_api::database::{TimeEntry, TimeEntryStore};
use timesheet_api::types::hours_between;

async fn seed_span(app: &TestApp, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    app.store.put_entry(&TimeEntry::clock_in(common::USER, start)).await?;
    app.store
        .put_entry(&TimeEntry::clock_out(common::USER, end, hours_between(start, end), Some(start)))
        .await?;
    Ok(())
}

async fn seed_working_day(app: &TestApp) -> Result<()> {
    seed_span(app, at(9, 0), at(12, 30)).await?;
    seed_span(app, at(13, 0), at(17, 15)).await
}

#[tokio::test]
async fn day_totals_sum_clock_out_hours() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;

    let res = app
        .get("/api/timesheets?start_date=2025-01-15&end_date=2025-01-15", &common::user_token())
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    assert_eq!(body["totalHours"], 7.75);
    assert_eq!(body["period"], "custom");
    assert_eq!(body["startDate"], "2025-01-15");
    assert_eq!(body["timesheets"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["timesheets"][0]["totalHours"], 7.75);
    assert_eq!(body["entries"].as_array().map(Vec::len), Some(4));
    // Newest first
    assert_eq!(body["entries"][0]["timestamp"], "2025-01-15T17:15:00Z");
    assert_eq!(body["entries"][0]["type"], "clock_out");
    Ok(())
}

#[tokio::test]
async fn single_day_range_excludes_neighbouring_days() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;
    let day = Duration::days(1);
    seed_span(&app, at(9, 0) - day, at(10, 0) - day).await?;
    seed_span(&app, at(9, 0) + day, at(10, 0) + day).await?;

    let body = app
        .get("/api/timesheets?startDate=2025-01-15&endDate=2025-01-15", &common::user_token())
        .await?
        .json()?;

    let entries = body["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e["date"] == "2025-01-15"));

    let all = app.get("/api/timesheets", &common::user_token()).await?.json()?;
    assert_eq!(all["timesheets"].as_array().map(Vec::len), Some(3));
    assert_eq!(all["timesheets"][0]["date"], "2025-01-16");
    assert_eq!(all["totalHours"], 9.75);
    Ok(())
}

#[tokio::test]
async fn period_listing_reports_its_bounds() -> Result<()> {
    let app = common::spawn_app();

    let body = app.get("/api/timesheets?period=today", &common::user_token()).await?.json()?;
    let today = Utc::now().date_naive().to_string();

    assert_eq!(body["period"], "today");
    assert_eq!(body["startDate"], today.as_str());
    assert_eq!(body["endDate"], today.as_str());

    let res = app.get("/api/timesheets?period=fortnight", &common::user_token()).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn explicit_dates_win_over_period() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;

    let body = app
        .get(
            "/api/timesheets?period=today&start_date=2025-01-15&end_date=2025-01-15",
            &common::user_token(),
        )
        .await?
        .json()?;

    assert_eq!(body["period"], "custom");
    assert_eq!(body["startDate"], "2025-01-15");
    assert_eq!(body["totalHours"], 7.75);

    // A lone date does not override the period
    let body = app
        .get("/api/timesheets?period=today&start_date=2025-01-15", &common::user_token())
        .await?
        .json()?;
    assert_eq!(body["period"], "today");
    Ok(())
}

#[tokio::test]
async fn field_edit_updates_annotations() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;

    let res = app
        .send_json(
            Method::PUT,
            "/api/timesheets",
            &common::user_token(),
            json!({
                "timestamp": "2025-01-15T12:30:00Z",
                "updates": {"description": "Quarterly planning", "project": "Ops", "mood": "great"}
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedEntry"]["description"], "Quarterly planning");
    assert!(body["updatedEntry"]["lastModified"].is_string());

    let stored = app.store.get_entry(common::USER, at(12, 30)).await?.expect("entry");
    assert_eq!(stored.project.as_deref(), Some("Ops"));
    Ok(())
}

#[tokio::test]
async fn unrecognised_updates_are_rejected() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;

    let res = app
        .send_json(
            Method::PUT,
            "/api/timesheets",
            &common::user_token(),
            json!({"timestamp": "2025-01-15T12:30:00Z", "updates": {"mood": "great"}}),
        )
        .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["error"], "No valid updates provided");
    Ok(())
}

#[tokio::test]
async fn retiming_a_clock_out_recomputes_hours() -> Result<()> {
    let app = common::spawn_app();
    seed_span(&app, at(9, 0), at(11, 0)).await?;

    let res = app
        .send_json(
            Method::PUT,
            "/api/timesheets",
            &common::user_token(),
            json!({
                "timestamp": "2025-01-15T11:00:00Z",
                "clock_out_timestamp": "2025-01-15T12:00:00Z",
                "hours": 10
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["updatedEntry"]["hours"], 3.0);

    assert!(app.store.get_entry(common::USER, at(11, 0)).await?.is_none());
    let moved = app.store.get_entry(common::USER, at(12, 0)).await?.expect("moved entry");
    assert_eq!(moved.hours, Decimal::from(3));
    Ok(())
}

#[tokio::test]
async fn retiming_that_inverts_the_span_is_rejected() -> Result<()> {
    let app = common::spawn_app();
    seed_span(&app, at(9, 0), at(11, 0)).await?;

    let res = app
        .send_json(
            Method::PUT,
            "/api/timesheets",
            &common::user_token(),
            json!({"timestamp": "2025-01-15T11:00:00Z", "clock_out_timestamp": "2025-01-15T08:00:00Z"}),
        )
        .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.store.get_entry(common::USER, at(11, 0)).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn updating_a_missing_entry_is_not_found() -> Result<()> {
    let app = common::spawn_app();

    let res = app
        .send_json(
            Method::PUT,
            "/api/timesheets",
            &common::user_token(),
            json!({"timestamp": "2025-01-15T11:00:00Z", "updates": {"hours": 1}}),
        )
        .await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()?["error"], "Timesheet entry not found");
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_entry_once() -> Result<()> {
    let app = common::spawn_app();
    seed_working_day(&app).await?;
    let token = common::user_token();
    let body = json!({"timestamp": "2025-01-15T13:00:00Z"});

    let res = app.send_json(Method::DELETE, "/api/timesheets", &token, body.clone()).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["message"], "Time entry deleted successfully");
    assert_eq!(app.store.all_entries(common::USER).await.len(), 3);

    let res = app.send_json(Method::DELETE, "/api/timesheets", &token, body).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.send_json(Method::DELETE, "/api/timesheets", &token, json!({})).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["error"], "timestamp is required for DELETE requests");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_reported() -> Result<()> {
    let app = common::spawn_app();
    let token = common::user_token();

    let res = app
        .request(Method::PUT, "/api/timesheets", Some(&token), Some(Body::from("{\"timestamp\": ")))
        .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["error"], "Invalid JSON in request body");
    Ok(())
}
