//! Lifecycle driver
//!
//! Validates configuration, decides what has to happen to each resource and
//! drives the resource callbacks in order: create, update, replace (delete
//! then create), refresh, destroy and import.

use crate::auth0::ActionApi;
use crate::resource::action::ActionResource;
use crate::resource::{Diagnostic, Resource, ResourceData, ResourceRegistry};
use crate::state::ResourceState;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// What applying a configuration will do to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    NoOp,
    Create,
    Update,
    /// Delete and create again, e.g. because an immutable attribute changed
    Replace,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::NoOp => f.write_str("no changes"),
            PlanAction::Create => f.write_str("create"),
            PlanAction::Update => f.write_str("update in-place"),
            PlanAction::Replace => f.write_str("replace"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub action: PlanAction,
    /// Attributes whose value changes
    pub changed: Vec<&'static str>,
    /// Attributes forcing replacement
    pub replace_because: Vec<&'static str>,
    /// Values the resource should have afterwards
    pub planned: Map<String, Value>,
}

/// Outcome of an apply. The state is kept even when the apply failed, so a
/// resource created before a later step failed is not lost.
#[derive(Debug)]
pub struct ApplyResult {
    pub state: Option<ResourceState>,
    pub error: Option<anyhow::Error>,
}

impl ApplyResult {
    fn ok(state: Option<ResourceState>) -> Self {
        Self { state, error: None }
    }

    pub fn into_result(self) -> Result<Option<ResourceState>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.state),
        }
    }
}

/// Configuration validation failure
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration for {type_name}:\n{}", format_diagnostics(.diagnostics))]
pub struct InvalidConfig {
    pub type_name: String,
    pub diagnostics: Vec<Diagnostic>,
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  - {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct Provider {
    registry: ResourceRegistry,
}

impl Provider {
    /// Provider with every resource type registered against `api`
    pub fn new(api: Arc<dyn ActionApi>) -> Self {
        let mut registry = ResourceRegistry::new();
        registry.register(Arc::new(ActionResource::new(api)));
        Self { registry }
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        self.registry.get_all_resource_types()
    }

    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>> {
        self.registry
            .get_resource(type_name)
            .with_context(|| format!("Unknown resource type: {}", type_name))
    }

    /// Validate `config` and decide what applying it would do. Never calls the API.
    pub fn plan(
        &self,
        type_name: &str,
        prior: Option<&ResourceState>,
        config: &Map<String, Value>,
    ) -> Result<Plan> {
        let resource = self.resource(type_name)?;
        let schema = resource.schema();

        let diagnostics = schema.validate_config(config);
        if !diagnostics.is_empty() {
            return Err(InvalidConfig {
                type_name: type_name.to_string(),
                diagnostics,
            }
            .into());
        }

        let planned = schema.planned_values(prior.map(|p| &p.attributes), config);

        let plan = match prior {
            None => Plan {
                action: PlanAction::Create,
                changed: schema.changed_fields(&Map::new(), &planned),
                replace_because: Vec::new(),
                planned,
            },
            Some(prior) => {
                let changed = schema.changed_fields(&prior.attributes, &planned);
                let replace_because = schema.force_new_changes(&prior.attributes, &planned);
                let action = if prior.tainted || !replace_because.is_empty() {
                    PlanAction::Replace
                } else if !changed.is_empty() {
                    PlanAction::Update
                } else {
                    PlanAction::NoOp
                };
                Plan {
                    action,
                    changed,
                    replace_because,
                    planned,
                }
            }
        };

        tracing::debug!("Planned {} for {}: {:?}", plan.action, type_name, plan.changed);
        Ok(plan)
    }

    /// Bring a resource in line with `config`
    pub async fn apply(
        &self,
        type_name: &str,
        prior: Option<&ResourceState>,
        config: &Map<String, Value>,
    ) -> ApplyResult {
        let plan = match self.plan(type_name, prior, config) {
            Ok(plan) => plan,
            Err(err) => {
                return ApplyResult {
                    state: prior.cloned(),
                    error: Some(err),
                }
            }
        };

        match (plan.action, prior) {
            (PlanAction::NoOp, _) => ApplyResult::ok(prior.cloned()),
            (PlanAction::Update, Some(prior)) => self.update(type_name, prior, plan.planned).await,
            (PlanAction::Replace, Some(prior)) => {
                tracing::info!(
                    "Replacing {} {} ({:?} changed)",
                    type_name,
                    prior.id,
                    plan.replace_because
                );
                if let Err(err) = self.destroy(type_name, prior).await {
                    return ApplyResult {
                        state: Some(prior.clone()),
                        error: Some(err),
                    };
                }
                self.create(type_name, plan.planned).await
            }
            _ => self.create(type_name, plan.planned).await,
        }
    }

    async fn create(&self, type_name: &str, planned: Map<String, Value>) -> ApplyResult {
        let resource = match self.resource(type_name) {
            Ok(resource) => resource,
            Err(err) => return ApplyResult { state: None, error: Some(err) },
        };

        let mut d = ResourceData::new(planned);
        let result = resource.create(&mut d).await;

        let id = d.id().to_string();
        match result {
            Ok(()) if id.is_empty() => ApplyResult {
                state: None,
                error: Some(anyhow::anyhow!(
                    "{} was created but disappeared before it could be read",
                    type_name
                )),
            },
            Ok(()) => ApplyResult::ok(Some(ResourceState::new(type_name, &id, d.into_values()))),
            Err(err) if id.is_empty() => ApplyResult {
                state: None,
                error: Some(err),
            },
            Err(err) => {
                tracing::warn!("{} {} created but left tainted: {:#}", type_name, id, err);
                let mut state = ResourceState::new(type_name, &id, d.into_values());
                state.tainted = true;
                ApplyResult {
                    state: Some(state),
                    error: Some(err),
                }
            }
        }
    }

    async fn update(
        &self,
        type_name: &str,
        prior: &ResourceState,
        planned: Map<String, Value>,
    ) -> ApplyResult {
        let resource = match self.resource(type_name) {
            Ok(resource) => resource,
            Err(err) => {
                return ApplyResult {
                    state: Some(prior.clone()),
                    error: Some(err),
                }
            }
        };

        let mut d = ResourceData::for_update(&prior.id, prior.attributes.clone(), planned);
        if let Err(err) = resource.update(&mut d).await {
            // Keep the prior state so the next plan still sees the pending change
            return ApplyResult {
                state: Some(prior.clone()),
                error: Some(err),
            };
        }

        let id = d.id().to_string();
        if id.is_empty() {
            return ApplyResult::ok(None);
        }
        ApplyResult::ok(Some(ResourceState::new(type_name, &id, d.into_values())))
    }

    /// Re-read a resource. `None` means it no longer exists remotely.
    pub async fn refresh(&self, state: &ResourceState) -> Result<Option<ResourceState>> {
        let resource = self.resource(&state.type_name)?;

        let mut d = ResourceData::from_state(&state.id, state.attributes.clone());
        resource.read(&mut d).await?;

        let id = d.id().to_string();
        if id.is_empty() {
            return Ok(None);
        }

        let mut refreshed = ResourceState::new(&state.type_name, &id, d.into_values());
        refreshed.tainted = state.tainted;
        Ok(Some(refreshed))
    }

    pub async fn destroy(&self, type_name: &str, state: &ResourceState) -> Result<()> {
        let resource = self.resource(type_name)?;
        let mut d = ResourceData::from_state(&state.id, state.attributes.clone());
        resource.delete(&mut d).await
    }

    /// Adopt an existing remote object by ID
    pub async fn import(&self, type_name: &str, id: &str) -> Result<ResourceState> {
        let resource = self.resource(type_name)?;

        let mut d = ResourceData::from_state(id, Map::new());
        resource.import(&mut d).await?;
        resource.read(&mut d).await?;

        if d.id().is_empty() {
            anyhow::bail!("Cannot import non-existent remote object {} {}", type_name, id);
        }

        Ok(ResourceState::new(type_name, id, d.into_values()))
    }
}
