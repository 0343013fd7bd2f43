//! `auth0_action` resource
//!
//! Maps the resource data bag onto [`Action`] payloads and back. Secrets are
//! write-only: they are pushed with a replace-all call and never read back.

use super::data::ResourceData;
use super::schema::{FieldSchema, ResourceSchema};
use super::validation::{string_in_slice, string_match};
use super::Resource;
use crate::auth0::{Action, ActionApi, ActionSecrets};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const TYPE_NAME: &str = "auth0_action";

/// Trigger kinds an action can attach to
pub const SUPPORTED_TRIGGERS: &[&str] = &[
    "post-login",
    "credentials-exchange",
    "pre-user-registration",
    "post-user-registration",
    "post-change-password",
    "send-phone-message",
    "iga-fulfillment-execution",
    "iga-fulfillment-assignment",
    "iga-approval",
    "iga-certification",
];

// No leading/trailing ASCII whitespace or hyphen, word characters, spaces and
// hyphens in between
const NAME_PATTERN: &str = r"^[^\t\n\f\r -][A-Za-z0-9_ -]+[^\t\n\f\r -]$";

const NAME_MESSAGE: &str = "Can only contain alphanumeric characters, spaces and '-'. \
     Can neither start nor end with '-' or spaces.";

fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(NAME_PATTERN).expect("action name pattern compiles"))
}

/// Check an action name
pub fn validate_name(name: &str) -> Result<(), String> {
    string_match(name_regex().clone(), NAME_MESSAGE).validate("name", name)
}

/// Check a trigger kind
pub fn validate_trigger(trigger: &str) -> Result<(), String> {
    string_in_slice(SUPPORTED_TRIGGERS, false).validate("supported_triggers", trigger)
}

/// Schema of the `auth0_action` resource
pub fn schema() -> &'static ResourceSchema {
    static SCHEMA: OnceLock<ResourceSchema> = OnceLock::new();
    SCHEMA.get_or_init(build_schema)
}

fn build_schema() -> ResourceSchema {
    ResourceSchema::new()
        .field(
            "name",
            FieldSchema::string()
                .required()
                .validate(string_match(name_regex().clone(), NAME_MESSAGE))
                .description("The name of an action."),
        )
        .field(
            "dependencies",
            FieldSchema::string_map().optional().description(
                "The list of third party npm modules, and their versions, that this action depends on.",
            ),
        )
        .field(
            "code",
            FieldSchema::string()
                .optional()
                .description("The source code of the action."),
        )
        .field(
            "runtime",
            FieldSchema::string()
                .optional()
                .computed()
                .description("The Node runtime. For example: node12, defaults to node12"),
        )
        .field(
            "supported_triggers",
            FieldSchema::string()
                .required()
                .force_new()
                .validate(string_in_slice(SUPPORTED_TRIGGERS, false))
                .description(
                    "The trigger this action supports. An action can only target a single trigger at a time.",
                ),
        )
        .field(
            "enabled",
            FieldSchema::bool()
                .optional()
                .computed()
                .description("Whether the action is enabled."),
        )
        .field(
            "secrets",
            FieldSchema::string_map()
                .optional()
                .sensitive()
                .description("The secrets that are included in an action."),
        )
}

pub struct ActionResource {
    api: Arc<dyn ActionApi>,
}

impl ActionResource {
    pub fn new(api: Arc<dyn ActionApi>) -> Self {
        Self { api }
    }

    /// Push secrets when the resource is new or its secrets changed
    pub async fn upsert_secrets(&self, d: &ResourceData) -> Result<()> {
        if !(d.is_new_resource() || d.has_change("secrets")) {
            return Ok(());
        }

        let secrets = to_action_secrets(d);
        tracing::debug!("Replacing {} secrets of action {}", secrets.len(), d.id());

        self.api
            .replace_secrets(d.id(), &secrets)
            .await
            .with_context(|| format!("Failed to replace secrets of action {}", d.id()))
    }
}

fn to_action_secrets(d: &ResourceData) -> ActionSecrets {
    d.get_string_map("secrets").unwrap_or_default()
}

/// Build the API payload from resource data
pub fn build_action(d: &ResourceData) -> Action {
    Action {
        id: None,
        name: d.get_string("name"),
        script: d.get_string("code"),
        // Immutable once created, changes go through replacement
        trigger_id: if d.is_new_resource() {
            d.get_string("supported_triggers")
        } else {
            None
        },
        runtime: d.get_string("runtime"),
        enabled: d.get_bool("enabled"),
        dependencies: d.get_string_map("dependencies"),
    }
}

#[async_trait]
impl Resource for ActionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &ResourceSchema {
        schema()
    }

    async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let action = build_action(d);
        tracing::info!("Creating action {:?}", action.name);

        let created = self
            .api
            .create(&action)
            .await
            .context("Failed to create action")?;
        let id = created
            .id
            .filter(|id| !id.is_empty())
            .context("Action was created but the API returned no id")?;
        d.set_id(id);

        self.upsert_secrets(d).await?;
        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let action = match self.api.read(d.id()).await {
            Ok(action) => action,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Action {} no longer exists, removing from state", d.id());
                d.set_id("");
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read action {}", d.id()));
            }
        };

        d.set("name", action.name);
        d.set_string_map("dependencies", action.dependencies.as_ref());
        d.set("code", action.script);
        d.set("supported_triggers", action.trigger_id);
        d.set("runtime", action.runtime);
        d.set("enabled", action.enabled);
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData) -> Result<()> {
        let action = build_action(d);
        tracing::info!("Updating action {}", d.id());

        self.api
            .update(d.id(), &action)
            .await
            .with_context(|| format!("Failed to update action {}", d.id()))?;

        self.upsert_secrets(d).await?;
        self.read(d).await
    }

    async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        tracing::info!("Deleting action {}", d.id());

        match self.api.delete(d.id()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Action {} was already deleted", d.id());
                d.set_id("");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete action {}", d.id())),
        }
    }
}
