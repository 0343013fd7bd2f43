//! Resource abstraction layer
//!
//! A resource declares a schema and implements lifecycle callbacks that the
//! driver in [`crate::provider`] invokes.
//!
//! # Architecture
//!
//! - [`schema`] - Attribute declarations and plan-time validation
//! - [`validation`] - Reusable attribute validators
//! - [`data`] - The data bag passed to every callback
//! - [`registry`] - Lookup of resource implementations by type name
//! - [`action`] - The `auth0_action` resource
//!
//! # Callback contract
//!
//! - `create` must set the ID before returning successfully
//! - `read` clears the ID when the remote object no longer exists
//! - `delete` treats an already-missing object as deleted

pub mod action;
pub mod data;
pub mod registry;
pub mod schema;
pub mod validation;

use anyhow::Result;
use async_trait::async_trait;

pub use data::ResourceData;
pub use registry::ResourceRegistry;
pub use schema::{Diagnostic, FieldSchema, FieldType, ResourceSchema};

/// Lifecycle callbacks of one resource type
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> &ResourceSchema;

    async fn create(&self, d: &mut ResourceData) -> Result<()>;

    async fn read(&self, d: &mut ResourceData) -> Result<()>;

    async fn update(&self, d: &mut ResourceData) -> Result<()>;

    async fn delete(&self, d: &mut ResourceData) -> Result<()>;

    /// Prepare data for an imported ID before the first read.
    /// The default passes the ID through untouched.
    async fn import(&self, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("Importing {} {}", self.type_name(), d.id());
        Ok(())
    }
}
