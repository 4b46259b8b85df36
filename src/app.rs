use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::database::{SessionStore, StoreHealth, TimeEntryStore};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{ClockService, CorrectionService, SessionTracker, TimesheetService};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub clock: ClockService,
    pub corrections: CorrectionService,
    pub timesheets: TimesheetService,
    pub sessions: SessionTracker,
    pub health: Arc<dyn StoreHealth>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        entries: Arc<dyn TimeEntryStore>,
        sessions: Arc<dyn SessionStore>,
        health: Arc<dyn StoreHealth>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let tracker = SessionTracker::new(sessions);
        Self {
            clock: ClockService::new(entries.clone(), tracker.clone()),
            corrections: CorrectionService::new(entries.clone(), tracker.clone()),
            timesheets: TimesheetService::new(entries),
            sessions: tracker,
            health,
            verifier,
        }
    }

    /// State over one store that serves entries, sessions and health checks
    pub fn with_store<S>(store: Arc<S>, verifier: Arc<dyn TokenVerifier>) -> Self
    where
        S: TimeEntryStore + SessionStore + StoreHealth + 'static,
    {
        Self::new(store.clone(), store.clone(), store, verifier)
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(answer_options))
        .layer(cors_layer(&config.security.cors_origins));

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    use protected::{clock, timesheets};

    Router::new()
        .route("/api/clock", post(clock::clock_action))
        .route("/api/clock/status", get(clock::clock_status))
        .route(
            "/api/timesheets",
            get(timesheets::list_timesheets)
                .put(timesheets::update_entry)
                .delete(timesheets::delete_entry),
        )
        .route("/api/timesheets/export", post(timesheets::export_timesheets))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

/// Bare OPTIONS requests get an empty 200 on any path; CORS preflights are
/// answered by the CORS layer before reaching this point
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    ApiError::internal_server_error().into_response()
}
