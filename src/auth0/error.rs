//! Management API errors

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error returned by the Management API client
#[derive(Debug, Error)]
pub enum ManagementError {
    /// The API answered with a non-success status
    #[error("{error}: {message} (status {})", .status.as_u16())]
    Api {
        status: StatusCode,
        error: String,
        message: String,
    },

    /// Authentication could not be established
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Error body returned by the platform, e.g.
/// `{"statusCode": 404, "error": "Not Found", "message": "The hook does not exist."}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ManagementError {
    /// Build an API error from a status code and raw response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let error = parsed
            .as_ref()
            .and_then(|b| b.error.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| "API request failed".to_string());

        ManagementError::Api {
            status,
            error,
            message,
        }
    }

    /// HTTP status of the failed call, if the API answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ManagementError::Api { status, .. } => Some(*status),
            ManagementError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Check whether an error chain bottoms out in a Management API 404
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<ManagementError>())
        .any(ManagementError::is_not_found)
}
