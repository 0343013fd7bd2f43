//! State file
//!
//! Records the ID and last known attributes of every managed resource,
//! keyed by address. Stored as pretty-printed JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const STATE_VERSION: u32 = 1;

/// Recorded state of one resource instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    /// Set when creation failed half-way; the next apply replaces the resource
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tainted: bool,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceState {
    pub fn new(type_name: &str, id: &str, attributes: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.to_string(),
            id: id.to_string(),
            tainted: false,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Default state path: `auth0-actions.state.json` in the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from("auth0-actions.state.json")
    }

    /// Load state from disk; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No state file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file {}", path.display()))?;

        if state.version != STATE_VERSION {
            anyhow::bail!(
                "Unsupported state file version {} (expected {})",
                state.version,
                STATE_VERSION
            );
        }

        Ok(state)
    }

    /// Save state to disk, writing through a temporary file
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file {}", path.display()))?;

        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    /// Record or forget the state of `address`
    pub fn set(&mut self, address: &str, state: Option<ResourceState>) {
        match state {
            Some(state) => {
                self.resources.insert(address.to_string(), state);
            }
            None => {
                self.resources.remove(address);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("none.json")).unwrap();
        assert!(state.resources.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = StateFile::default();
        let attrs = json!({"name": "abc"}).as_object().cloned().unwrap();
        state.set("login", Some(ResourceState::new("auth0_action", "id-1", attrs)));
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.get("login"), state.get("login"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_tainted_flag_is_omitted_when_false() {
        let state = ResourceState::new("auth0_action", "id-1", Map::new());
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("tainted").is_none());
        assert_eq!(value["type"], "auth0_action");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"version": 9, "updated_at": "2024-01-01T00:00:00Z", "resources": {}}"#,
        )
        .unwrap();
        assert!(StateFile::load(&path).is_err());
    }
}
