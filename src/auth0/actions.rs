//! Action endpoints of the Management API

use super::client::ManagementClient;
use super::error::ManagementError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An action as sent to and returned by the Management API.
///
/// Unset fields are omitted from the request body, so a PATCH only touches
/// what was provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Trigger the action is bound to. Immutable once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// npm module name -> version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,
}

/// Secret name -> value, replaced wholesale
pub type ActionSecrets = BTreeMap<String, String>;

/// Operations on actions. Errors keep the HTTP status so callers can tell a
/// 404 apart from everything else.
#[async_trait]
pub trait ActionApi: Send + Sync {
    /// Create an action, returning it with its assigned ID
    async fn create(&self, action: &Action) -> Result<Action, ManagementError>;

    async fn read(&self, id: &str) -> Result<Action, ManagementError>;

    async fn update(&self, id: &str, action: &Action) -> Result<Action, ManagementError>;

    async fn delete(&self, id: &str) -> Result<(), ManagementError>;

    /// Replace every secret of the action with `secrets`
    async fn replace_secrets(&self, id: &str, secrets: &ActionSecrets)
        -> Result<(), ManagementError>;
}

const COLLECTION: &str = "hooks";

#[async_trait]
impl ActionApi for ManagementClient {
    async fn create(&self, action: &Action) -> Result<Action, ManagementError> {
        let url = self.api_url(&[COLLECTION])?;
        let token = self.get_token().await?;
        self.http.post(&url, &token, action).await
    }

    async fn read(&self, id: &str) -> Result<Action, ManagementError> {
        let url = self.api_url(&[COLLECTION, id])?;
        let token = self.get_token().await?;
        self.http.get(&url, &token).await
    }

    async fn update(&self, id: &str, action: &Action) -> Result<Action, ManagementError> {
        let url = self.api_url(&[COLLECTION, id])?;
        let token = self.get_token().await?;
        self.http.patch(&url, &token, action).await
    }

    async fn delete(&self, id: &str) -> Result<(), ManagementError> {
        let url = self.api_url(&[COLLECTION, id])?;
        let token = self.get_token().await?;
        self.http.delete(&url, &token).await
    }

    async fn replace_secrets(
        &self,
        id: &str,
        secrets: &ActionSecrets,
    ) -> Result<(), ManagementError> {
        let url = self.api_url(&[COLLECTION, id, "secrets"])?;
        let token = self.get_token().await?;
        self.http.put(&url, &token, secrets).await
    }
}
