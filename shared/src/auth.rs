//! OAuth2 client-credentials tokens for Microsoft Graph.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::{Config, Error, Result};

/// Seconds shaved off the server-declared lifetime.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Single-slot token cache owned by the process entry point.
///
/// The lock only guards the slot itself and is never held across the token
/// request, so concurrent misses may each fetch a token; the last one wins.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token, if one exists and `now` is strictly before its expiry.
    pub async fn get(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| cached.access_token.clone())
    }

    pub async fn store(&self, access_token: String, expires_at: DateTime<Utc>) {
        let mut slot = self.slot.write().await;
        *slot = Some(CachedToken {
            access_token,
            expires_at,
        });
    }

    /// Expiry of the cached token, expired or not.
    #[cfg(test)]
    pub(crate) async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.slot.read().await.as_ref().map(|cached| cached.expires_at)
    }

    #[cfg(test)]
    pub(crate) async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

/// Acquires app-only access tokens through the client-credentials grant.
pub struct TokenProvider {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Arc<TokenCache>,
    clock: Arc<dyn Clock>,
}

impl TokenProvider {
    pub fn new(
        http_client: reqwest::Client,
        config: &Config,
        cache: Arc<TokenCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            cache,
            clock,
        }
    }

    /// Return a valid access token, requesting a new one when the cache is
    /// empty or expired.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cache.get(self.clock.now()).await {
            debug!("Using cached access token");
            return Ok(token);
        }

        debug!("Requesting new access token");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let token_response: TokenResponse = response.json().await?;

        let expires_at = Duration::try_seconds(
            token_response.expires_in.saturating_sub(EXPIRY_MARGIN_SECS),
        )
        .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
        .ok_or_else(|| Error::Auth {
            status: status.as_u16(),
            message: format!("Unusable expires_in {}", token_response.expires_in),
        })?;
        self.cache
            .store(token_response.access_token.clone(), expires_at)
            .await;

        info!("Acquired access token valid until {}", expires_at.to_rfc3339());

        Ok(token_response.access_token)
    }
}
