use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use timesheet_api::app::{app, AppState};
use timesheet_api::auth::{HmacVerifier, JwksVerifier, TokenVerifier};
use timesheet_api::config::{config, AppConfig, StoreBackend};
use timesheet_api::database::{DatabaseManager, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting Timesheet API in {:?} mode", config.environment);

    let verifier = build_verifier(config)?;
    let state = build_state(config, verifier).await?;
    let app = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Timesheet API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Timesheet API stopped");
    Ok(())
}

fn build_verifier(config: &AppConfig) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    let security = &config.security;
    let issuer = security.jwt_issuer.as_deref();
    let audience = security.jwt_audience.as_deref();

    match &security.jwks_url {
        Some(url) => {
            tracing::info!("Verifying RS256 tokens against {}", url);
            let verifier = JwksVerifier::new(url, issuer, audience, Duration::from_secs(security.jwks_cache_secs))?;
            Ok(Arc::new(verifier))
        }
        None => {
            tracing::info!("Verifying HS256 tokens with the configured shared secret");
            Ok(Arc::new(HmacVerifier::new(&security.jwt_secret, issuer, audience)?))
        }
    }
}

async fn build_state(config: &AppConfig, verifier: Arc<dyn TokenVerifier>) -> anyhow::Result<AppState> {
    match config.database.backend {
        StoreBackend::Memory => {
            if timesheet_api::is_production!() {
                anyhow::bail!("STORE_BACKEND=memory is not allowed in production");
            }
            tracing::warn!("Using the in-memory store; entries are lost on restart");
            Ok(AppState::with_store(Arc::new(MemoryStore::new()), verifier))
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to the database")?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
            }
            Ok(AppState::with_store(Arc::new(PgStore::new(pool)), verifier))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
