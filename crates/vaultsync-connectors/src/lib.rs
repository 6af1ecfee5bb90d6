//! Platform connectors for the vaultsync backup engine.
//!
//! Provides the [`Connector`] capability trait, the shared paginated
//! [`FetchEngine`], credential alias resolution, the endpoint catalog
//! with dependency-DAG validation, the platform registry, and the
//! concrete platform implementations.

#![warn(clippy::pedantic)]

pub mod auth;
pub mod catalog;
pub mod connector;
pub mod fetch;
pub mod hubspot;
pub mod registry;
pub mod stripe;

pub use auth::CredentialMap;
pub use catalog::EndpointCatalog;
pub use connector::Connector;
pub use fetch::FetchEngine;
pub use registry::{ConnectorRegistry, ConnectorSettings};
