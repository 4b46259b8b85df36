#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::util::ServiceExt;

use timesheet_api::app::{app, AppState};
use timesheet_api::auth::{generate_jwt, Claims, HmacVerifier};
use timesheet_api::config::AppConfig;
use timesheet_api::database::MemoryStore;

pub const SECRET: &str = "integration-test-secret";
pub const USER: &str = "user-123";

/// Router over an in-memory store, plus direct access to that store for
/// seeding and inspection
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not JSON")
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let verifier = Arc::new(HmacVerifier::new(SECRET, None, None).expect("verifier"));
    let state = AppState::with_store(store.clone(), verifier);

    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();

    TestApp {
        router: app(state, &config),
        store,
    }
}

pub fn token_for(user: &str) -> String {
    generate_jwt(&Claims::new(user, 1), SECRET).expect("token")
}

pub fn user_token() -> String {
    token_for(USER)
}

/// Instant on 2025-01-15 (UTC)
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0).unwrap()
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Body>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder.body(body.unwrap_or_else(Body::empty))?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn send_json(&self, method: Method, uri: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(method, uri, Some(token), Some(Body::from(body.to_string())))
            .await
    }
}
