use anyhow::Context;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::config;

pub fn handle(user: &str, hours: Option<u64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    if security.jwks_url.is_some() {
        tracing::warn!("SECURITY_JWKS_URL is set; the server will not accept HS256 tokens");
    }

    let hours = hours.unwrap_or(security.jwt_expiry_hours);
    let mut claims = Claims::new(user, hours);
    if let Some(issuer) = &security.jwt_issuer {
        claims = claims.with_issuer(issuer.clone());
    }
    if let Some(audience) = &security.jwt_audience {
        claims = claims.with_audience(audience.clone());
    }

    let token = generate_jwt(&claims, &security.jwt_secret).context("failed to sign token")?;

    output_success(
        output_format,
        &format!("Token for '{}' valid for {} hour(s)", user, hours),
        Some(json!({ "token": token, "expires_at": claims.exp })),
    )
}
