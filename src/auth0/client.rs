//! Management API client
//!
//! Combines the tenant base URL, credentials and the HTTP wrapper.

use super::auth::{Credentials, TokenSource};
use super::error::ManagementError;
use super::http::ManagementHttpClient;
use anyhow::{Context, Result};
use url::Url;

/// Main Management API client
#[derive(Clone)]
pub struct ManagementClient {
    pub http: ManagementHttpClient,
    tokens: TokenSource,
    base_url: Url,
}

impl ManagementClient {
    /// Create a client for a tenant domain such as `example.eu.auth0.com`
    pub fn new(domain: &str, credentials: Credentials) -> Result<Self> {
        let base = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Self::with_base_url(&base, credentials)
    }

    /// Create a client against an explicit base URL (custom domains, tests)
    pub fn with_base_url(base_url: &str, credentials: Credentials) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = ManagementHttpClient::new().context("Failed to create HTTP client")?;
        let tokens = TokenSource::new(credentials, &base_url)?;

        Ok(Self {
            http,
            tokens,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String, ManagementError> {
        self.tokens.get_token(self.http.inner()).await
    }

    /// Build a Management API v2 URL; each segment is percent-encoded
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, ManagementError> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(self.base_url.join(&format!("api/v2/{}", path))?)
    }
}
