use anyhow::Context;
use serde_json::json;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = &config().database;

    let pool = DatabaseManager::connect(db)
        .await
        .context("failed to connect to the database")?;
    DatabaseManager::migrate(&pool)
        .await
        .context("failed to apply migrations")?;

    output_success(
        output_format,
        "Database schema is up to date",
        Some(json!({ "max_connections": db.max_connections })),
    )
}
