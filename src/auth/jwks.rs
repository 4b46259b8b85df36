use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use super::{require_subject, AuthError, Claims, TokenVerifier};

/// Minimum spacing between refetches triggered by an unknown `kid`
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// RS256 verification against an identity provider's rotating key set.
/// Keys are cached and refetched on TTL expiry or when a token names an
/// unknown key id.
pub struct JwksVerifier {
    jwks_url: Option<Url>,
    client: reqwest::Client,
    validation: Validation,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedKeySet>>,
}

impl JwksVerifier {
    pub fn new(
        jwks_url: &str,
        issuer: Option<&str>,
        audience: Option<&str>,
        cache_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let url = Url::parse(jwks_url)
            .map_err(|e| AuthError::Misconfigured(format!("invalid JWKS URL '{}': {}", jwks_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Misconfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            jwks_url: Some(url),
            client,
            validation: Self::validation(issuer, audience),
            cache_ttl,
            cache: RwLock::new(None),
        })
    }

    /// Verifier over a fixed key set that is never refetched
    pub fn from_key_set(keys: JwkSet, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            jwks_url: None,
            client: reqwest::Client::new(),
            validation: Self::validation(issuer, audience),
            cache_ttl: Duration::MAX,
            cache: RwLock::new(Some(CachedKeySet {
                keys,
                fetched_at: Instant::now(),
            })),
        }
    }

    fn validation(issuer: Option<&str>, audience: Option<&str>) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }

    async fn cached_key(&self, kid: &str) -> (Option<DecodingKey>, bool) {
        let cache = self.cache.read().await;
        match cache.as_ref() {
            Some(cached) => {
                let key = cached.keys.find(kid).and_then(|jwk| DecodingKey::from_jwk(jwk).ok());
                let stale = cached.fetched_at.elapsed() > self.cache_ttl;
                let may_refetch = cached.fetched_at.elapsed() > MIN_REFRESH_INTERVAL;
                (key.filter(|_| !stale), stale || may_refetch)
            }
            None => (None, true),
        }
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        let Some(url) = &self.jwks_url else {
            return Err(AuthError::KeyUnavailable("no key set source configured".to_string()));
        };

        let keys = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyUnavailable(e.to_string()))?;

        info!("Fetched {} signing keys from {}", keys.keys.len(), url);
        *self.cache.write().await = Some(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let (key, may_refetch) = self.cached_key(kid).await;
        if let Some(key) = key {
            return Ok(key);
        }

        if !may_refetch || self.jwks_url.is_none() {
            return Err(AuthError::KeyUnavailable(format!("no signing key for kid '{}'", kid)));
        }

        if let Err(e) = self.refresh().await {
            warn!("Failed to refresh signing keys: {}", e);
            return Err(e);
        }

        match self.cached_key(kid).await {
            (Some(key), _) => Ok(key),
            (None, _) => Err(AuthError::KeyUnavailable(format!("no signing key for kid '{}'", kid))),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no key id".to_string()))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation)?;
        require_subject(data.claims)
    }
}
