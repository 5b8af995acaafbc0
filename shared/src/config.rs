//! Configuration management for the room status Lambda.

use chrono_tz::Tz;
use std::env;
use tracing::warn;

use crate::{Error, Result};

/// Scope requested for app-only Graph access.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Azure AD tenant
    pub tenant_id: String,
    /// App registration client id
    pub client_id: String,
    /// App registration client secret
    pub client_secret: String,
    /// ARN of a Secrets Manager secret holding the client secret
    pub client_secret_arn: Option<String>,
    /// Mailbox of the room resource
    pub room_email: String,
    /// OAuth scope
    pub scope: String,
    /// Zone used for the Graph `Prefer` header and time range rendering
    pub timezone: Tz,
    /// Identity provider base URL
    pub authority_host: String,
    /// Graph API base URL
    pub graph_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Missing credentials are not rejected here; they surface later as a
    /// failing token request. Only an unknown timezone fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            let value = lookup(key).unwrap_or_default();
            if value.is_empty() {
                warn!("{} is not set", key);
            }
            value
        };

        let client_secret_arn = lookup("CLIENT_SECRET_ARN").filter(|v| !v.is_empty());
        let client_secret = if client_secret_arn.is_some() {
            lookup("CLIENT_SECRET").unwrap_or_default()
        } else {
            required("CLIENT_SECRET")
        };

        let timezone_name =
            lookup("ROOM_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| Error::Config(format!("Invalid ROOM_TIMEZONE {}: {}", timezone_name, e)))?;

        Ok(Self {
            tenant_id: required("TENANT_ID"),
            client_id: required("CLIENT_ID"),
            client_secret,
            client_secret_arn,
            room_email: required("ROOM_EMAIL"),
            scope: GRAPH_SCOPE.to_string(),
            timezone,
            authority_host: lookup("AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
            graph_base_url: lookup("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Client-credentials token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }
}
