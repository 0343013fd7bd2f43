//! Auth0 Management API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - API token or client-credentials authentication
//! - [`client`] - Main client holding the tenant URL and credentials
//! - [`http`] - HTTP utilities for REST API calls
//! - [`actions`] - Action payloads and the [`actions::ActionApi`] operations
//! - [`error`] - Typed errors that keep the HTTP status
//!
//! # Example
//!
//! ```ignore
//! use auth0_actions::auth0::{ActionApi, Credentials, ManagementClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ManagementClient::new(
//!         "example.eu.auth0.com",
//!         Credentials::ApiToken("...".into()),
//!     )?;
//!     let action = client.read("01234").await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod auth;
pub mod client;
pub mod error;
pub mod http;

pub use actions::{Action, ActionApi, ActionSecrets};
pub use auth::Credentials;
pub use client::ManagementClient;
pub use error::{is_not_found, ManagementError};
