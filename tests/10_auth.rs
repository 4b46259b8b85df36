mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use axum::body::Body;
use axum::http::Request;
use tower::util::ServiceExt;

use timesheet_api::auth::{generate_jwt, Claims};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::spawn_app();

    let res = app.request(Method::GET, "/health", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn missing_token_is_rejected() -> Result<()> {
    let app = common::spawn_app();

    let res = app.request(Method::GET, "/api/clock/status", None, None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let body = res.json()?;
    assert_eq!(body["error"], "Missing token");
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn foreign_signature_is_invalid() -> Result<()> {
    let app = common::spawn_app();
    let token = generate_jwt(&Claims::new(common::USER, 1), "not-the-secret")?;

    let res = app.get("/api/clock/status", &token).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()?["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_invalid() -> Result<()> {
    let app = common::spawn_app();
    let mut claims = Claims::new(common::USER, 1);
    claims.exp = chrono::Utc::now().timestamp() - 3600;
    let token = generate_jwt(&claims, common::SECRET)?;

    let res = app.get("/api/clock/status", &token).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()?["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn options_returns_empty_ok_without_auth() -> Result<()> {
    let app = common::spawn_app();

    for uri in ["/api/clock", "/api/timesheets", "/api/timesheets/export", "/nowhere"] {
        let res = app.request(Method::OPTIONS, uri, None, None).await?;
        assert_eq!(res.status, StatusCode::OK, "OPTIONS {}", uri);
        assert!(res.body.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn responses_carry_cors_headers() -> Result<()> {
    let app = common::spawn_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/clock/status")
        .header(header::ORIGIN, "https://timesheets.example")
        .body(Body::empty())?;
    let res = app.router.clone().oneshot(request).await?;

    // Error responses are decorated too
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}

#[tokio::test]
async fn cors_preflight_is_answered() -> Result<()> {
    let app = common::spawn_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/timesheets")
        .header(header::ORIGIN, "https://timesheets.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())?;
    let res = app.router.clone().oneshot(request).await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    Ok(())
}
