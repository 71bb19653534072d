//! Google access-token providers.
//!
//! Every Google REST client in the workspace (Pub/Sub publisher, BigQuery
//! sink) presents an OAuth2 bearer token obtained through an
//! [`AccessTokenProvider`]. Two implementations are provided:
//!
//! - [`MetadataServerTokenProvider`] asks the GCE / Cloud Run metadata server
//!   for the attached service account's token and caches it until shortly
//!   before expiry.
//! - [`StaticTokenProvider`] serves a fixed token, typically taken from
//!   `GOOGLE_OAUTH_ACCESS_TOKEN` during local development.

use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Token endpoint of the metadata server for the default service account
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Environment variable holding a pre-issued access token
pub const STATIC_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Tokens this close to expiry are refreshed before use
const REFRESH_MARGIN_SECONDS: i64 = 60;

// ============================================================================
// Access Token
// ============================================================================

/// OAuth2 bearer token with its expiry
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    /// Raw token value for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check whether the token expires within `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens for Google APIs
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a token valid for at least the next request
    async fn access_token(&self) -> Result<AccessToken, AuthError>;
}

// ============================================================================
// Metadata Server Provider
// ============================================================================

/// Token response of the metadata server
#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

/// Fetches service-account tokens from the instance metadata server
///
/// The cached token is shared by all requests of the process; concurrent
/// callers that find it stale serialize on the write lock so only one of
/// them refreshes.
pub struct MetadataServerTokenProvider {
    http: reqwest::Client,
    endpoint: String,
    cached: RwLock<Option<AccessToken>>,
}

impl MetadataServerTokenProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoint(http, METADATA_TOKEN_URL)
    }

    /// Use a non-default token endpoint
    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            cached: RwLock::new(None),
        }
    }

    fn fresh(token: &Option<AccessToken>) -> Option<AccessToken> {
        token
            .as_ref()
            .filter(|t| !t.expires_within(Duration::seconds(REFRESH_MARGIN_SECONDS)))
            .cloned()
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        let response = self
            .http
            .get(&self.endpoint)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AuthError::TokenRequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                AuthError::TokenRequestFailed {
                    message: format!("metadata server returned {}: {}", status, body),
                }
            } else {
                AuthError::Rejected {
                    message: format!("metadata server returned {}: {}", status, body),
                }
            });
        }

        let parsed: MetadataTokenResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::InvalidTokenResponse {
                    message: e.to_string(),
                })?;

        if let Some(token_type) = parsed.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(AuthError::InvalidTokenResponse {
                    message: format!("unsupported token type '{}'", token_type),
                });
            }
        }

        let expires_at = Duration::try_seconds(parsed.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| AuthError::InvalidTokenResponse {
                message: format!("expires_in out of range: {}", parsed.expires_in),
            })?;

        debug!(expires_in = parsed.expires_in, "Obtained access token");

        Ok(AccessToken::new(parsed.access_token, expires_at))
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataServerTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = Self::fresh(&*self.cached.read().await) {
            return Ok(token);
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = Self::fresh(&cached) {
            return Ok(token);
        }

        let token = self.fetch().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

// ============================================================================
// Static Provider
// ============================================================================

/// Serves one fixed token that never expires from the caller's view
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `GOOGLE_OAUTH_ACCESS_TOKEN`, if set and non-empty
    pub fn from_env() -> Option<Self> {
        std::env::var(STATIC_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .map(Self::new)
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new(
            self.token.clone(),
            DateTime::<Utc>::MAX_UTC,
        ))
    }
}

/// Pick the token provider for this process
///
/// A token in `GOOGLE_OAUTH_ACCESS_TOKEN` wins; otherwise the metadata server
/// is used.
pub fn default_token_provider(http: reqwest::Client) -> Arc<dyn AccessTokenProvider> {
    match StaticTokenProvider::from_env() {
        Some(provider) => {
            info!("Using access token from {}", STATIC_TOKEN_ENV);
            Arc::new(provider)
        }
        None => {
            info!("Using metadata server for access tokens");
            Arc::new(MetadataServerTokenProvider::new(http))
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
