//! Configuration Management
//!
//! Provider settings are read from `config.json` in the user config directory
//! and overridden by `AUTH0_*` environment variables, then by CLI flags.

use crate::auth0::Credentials;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Provider configuration
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tenant domain, e.g. `example.eu.auth0.com`
    #[serde(default)]
    pub domain: Option<String>,
    /// Explicit API base URL, overrides `domain` (custom domains, local proxies)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Pre-issued Management API token, preferred over client credentials
    #[serde(default)]
    pub api_token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("auth0-actions").join("config.json"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Self {
        let from_file: Config = Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();

        from_file.with_env(|key| std::env::var(key).ok())
    }

    /// Apply `AUTH0_*` overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = var("AUTH0_DOMAIN") {
            self.domain = Some(v);
        }
        if let Some(v) = var("AUTH0_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Some(v) = var("AUTH0_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = var("AUTH0_CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = var("AUTH0_API_TOKEN") {
            self.api_token = Some(v);
        }
        self
    }

    /// Base URL of the tenant (`base_url` > `https://{domain}`)
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(base) = &self.base_url {
            return Ok(base.clone());
        }
        match &self.domain {
            Some(domain) => Ok(format!("https://{}", domain)),
            None => anyhow::bail!(
                "No Auth0 domain configured. Set AUTH0_DOMAIN or use --domain"
            ),
        }
    }

    /// Credentials to use (API token > client credentials)
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = &self.api_token {
            return Ok(Credentials::ApiToken(token.clone()));
        }
        match (&self.client_id, &self.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::ClientCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => anyhow::bail!(
                "No credentials configured. Set AUTH0_API_TOKEN, or AUTH0_CLIENT_ID and AUTH0_CLIENT_SECRET"
            ),
        }
    }
}
