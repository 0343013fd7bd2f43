//! Management API authentication
//!
//! Supports a static Management API token or the client-credentials grant
//! against the tenant's `/oauth/token` endpoint. Exchanged tokens are cached
//! until shortly before they expire.

use super::error::ManagementError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use url::Url;

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// TTL used when the token endpoint does not report `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How the client authenticates against the Management API
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued Management API token
    ApiToken(String),
    /// Machine-to-machine application exchanging its secret for a token
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.write_str("ApiToken(***)"),
            Credentials::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Token source with caching for exchanged tokens
#[derive(Clone)]
pub struct TokenSource {
    credentials: Credentials,
    token_url: Url,
    audience: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenSource {
    /// `base_url` is the tenant root, e.g. `https://example.eu.auth0.com/`
    pub fn new(credentials: Credentials, base_url: &Url) -> Result<Self, ManagementError> {
        let token_url = base_url.join("oauth/token")?;
        let audience = base_url.join("api/v2/")?.to_string();

        Ok(Self {
            credentials,
            token_url,
            audience,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an access token for API calls
    pub async fn get_token(&self, http: &Client) -> Result<String, ManagementError> {
        let (client_id, client_secret) = match &self.credentials {
            Credentials::ApiToken(token) => return Ok(token.clone()),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => (client_id, client_secret),
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        tracing::debug!("POST {}", self.token_url);

        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id,
            client_secret,
            audience: &self.audience,
        };

        let response = http
            .post(self.token_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Token exchange failed: {}", status);
            let err = ManagementError::from_response(status, &body);
            return Err(ManagementError::Auth(err.to_string()));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.access_token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_and_token_url() {
        let base = Url::parse("https://tenant.eu.auth0.com/").unwrap();
        let source = TokenSource::new(Credentials::ApiToken("t".to_string()), &base).unwrap();
        assert_eq!(source.token_url.as_str(), "https://tenant.eu.auth0.com/oauth/token");
        assert_eq!(source.audience, "https://tenant.eu.auth0.com/api/v2/");
    }

    #[tokio::test]
    async fn test_api_token_is_returned_as_is() {
        let base = Url::parse("https://tenant.eu.auth0.com/").unwrap();
        let source =
            TokenSource::new(Credentials::ApiToken("static-token".to_string()), &base).unwrap();
        let token = source.get_token(&Client::new()).await.unwrap();
        assert_eq!(token, "static-token");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::ClientCredentials {
            client_id: "abc".to_string(),
            client_secret: "hunter2".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("abc"));
        assert!(!printed.contains("hunter2"));
    }
}
