//! Declarative management of Auth0 actions.
//!
//! The [`resource::action`] module maps an `auth0_action` resource onto the
//! Management API; [`provider::Provider`] drives it through plan, apply,
//! refresh, destroy and import.

pub mod auth0;
pub mod config;
pub mod provider;
pub mod resource;
pub mod state;

pub use provider::{ApplyResult, Plan, PlanAction, Provider};
pub use state::{ResourceState, StateFile};
