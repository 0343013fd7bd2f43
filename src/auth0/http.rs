//! HTTP utilities for Management API calls

use super::error::ManagementError;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Management API calls
#[derive(Clone)]
pub struct ManagementHttpClient {
    client: Client,
}

impl ManagementHttpClient {
    pub fn new() -> Result<Self, ManagementError> {
        let client = Client::builder()
            .user_agent(concat!("auth0-actions/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }

    /// Underlying reqwest client, shared with the token exchange
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a request and return the raw JSON response (`Value::Null` when empty)
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<&B>,
    ) -> Result<Value, ManagementError> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url.clone())
            .bearer_auth(token);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let response_body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body, secrets may be echoed back
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ManagementError::from_response(status, &response_body));
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response_body)?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
    ) -> Result<T, ManagementError> {
        let value = self.send::<Value>(Method::GET, url, token, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
        body: &B,
    ) -> Result<T, ManagementError> {
        let value = self.send(Method::POST, url, token, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
        body: &B,
    ) -> Result<T, ManagementError> {
        let value = self.send(Method::PATCH, url, token, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// PUT a body, ignoring whatever the API answers with
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        token: &str,
        body: &B,
    ) -> Result<(), ManagementError> {
        self.send(Method::PUT, url, token, Some(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, url: &Url, token: &str) -> Result<(), ManagementError> {
        self.send::<Value>(Method::DELETE, url, token, None).await?;
        Ok(())
    }
}

/// Format a Management API error for display
pub fn format_management_error(error: &anyhow::Error) -> String {
    let Some(err) = error
        .chain()
        .find_map(|e| e.downcast_ref::<ManagementError>())
    else {
        return format!("{:#}", error);
    };

    match err.status().map(|s| s.as_u16()) {
        Some(401) => "Authentication failed. Check AUTH0_API_TOKEN or client credentials.".to_string(),
        Some(403) => "Permission denied. The token is missing a required scope.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(409) => "Resource conflict. An action with this name may already exist.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        _ => format!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(200)));
        assert!(out.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_format_management_error_not_found() {
        let err = anyhow::Error::new(ManagementError::from_response(StatusCode::NOT_FOUND, ""));
        assert_eq!(format_management_error(&err), "Resource not found.");
    }

    #[test]
    fn test_format_management_error_passthrough() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(format_management_error(&err), "something else");
    }
}
