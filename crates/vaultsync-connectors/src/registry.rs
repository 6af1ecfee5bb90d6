//! Platform registry: platform-type string → connector constructor.
//!
//! Built once at startup, validated at registration time, and exposed
//! through read-only lookups. A platform whose endpoint catalog fails
//! validation is rejected at registration, never during a run.

use std::collections::BTreeMap;
use std::time::Duration;

use vaultsync_types::error::ConnectorError;

use crate::auth::CredentialMap;
use crate::catalog::EndpointCatalog;
use crate::connector::Connector;
use crate::fetch::DEFAULT_TIMEOUT_SECS;
use crate::{hubspot, stripe};

/// Per-connection construction settings supplied by the caller
/// (job-level timeout limits and the like).
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Per-request timeout for every HTTP call the connector issues.
    pub request_timeout: Duration,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Constructor for one platform's connector.
pub type ConnectorCtor = Box<
    dyn Fn(&CredentialMap, &ConnectorSettings) -> Result<Box<dyn Connector>, ConnectorError>
        + Send
        + Sync,
>;

struct RegistryEntry {
    catalog: EndpointCatalog,
    ctor: ConnectorCtor,
}

/// Immutable factory map from platform-type string to constructor.
pub struct ConnectorRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry with every built-in platform registered.
    ///
    /// # Errors
    ///
    /// Returns the first catalog validation error; built-in catalogs are
    /// covered by tests, so this only fires on a bad edit.
    pub fn builtin() -> Result<Self, ConnectorError> {
        let mut registry = Self::new();
        registry.register(
            hubspot::PLATFORM,
            hubspot::catalog()?,
            Box::new(|creds, settings| {
                let connector: Box<dyn Connector> =
                    Box::new(hubspot::HubSpotConnector::with_settings(creds, settings)?);
                Ok(connector)
            }),
        )?;
        registry.register(
            stripe::PLATFORM,
            stripe::catalog()?,
            Box::new(|creds, settings| {
                let connector: Box<dyn Connector> =
                    Box::new(stripe::StripeConnector::with_settings(creds, settings)?);
                Ok(connector)
            }),
        )?;
        Ok(registry)
    }

    /// Register a platform with its validated catalog and constructor.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` when the platform type is
    /// already registered. Catalog validity is guaranteed by
    /// [`EndpointCatalog::new`], which is the only way to obtain one.
    pub fn register(
        &mut self,
        platform: impl Into<String>,
        catalog: EndpointCatalog,
        ctor: ConnectorCtor,
    ) -> Result<(), ConnectorError> {
        let platform = platform.into();
        if self.entries.contains_key(&platform) {
            return Err(ConnectorError::configuration(
                "DUPLICATE_PLATFORM",
                format!("platform '{platform}' is already registered"),
            ));
        }
        self.entries.insert(platform, RegistryEntry { catalog, ctor });
        Ok(())
    }

    /// Construct a connector for `platform` from raw credentials.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` for unknown platforms or
    /// whatever the constructor reports for bad credentials.
    pub fn create(
        &self,
        platform: &str,
        credentials: &CredentialMap,
        settings: &ConnectorSettings,
    ) -> Result<Box<dyn Connector>, ConnectorError> {
        let entry = self.entries.get(platform).ok_or_else(|| {
            ConnectorError::configuration(
                "UNKNOWN_PLATFORM",
                format!(
                    "no connector registered for platform '{platform}'; known: {}",
                    self.entries.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            )
        })?;
        (entry.ctor)(credentials, settings)
    }

    /// The validated catalog of a registered platform.
    #[must_use]
    pub fn catalog(&self, platform: &str) -> Option<&EndpointCatalog> {
        self.entries.get(platform).map(|e| &e.catalog)
    }

    /// Registered platform-type keys in sorted order.
    #[must_use]
    pub fn platforms(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultsync_types::endpoint::EndpointDescriptor;

    #[test]
    fn builtin_registers_both_platforms() {
        let registry = ConnectorRegistry::builtin().unwrap();
        assert_eq!(registry.platforms(), vec!["hubspot", "stripe"]);
        assert!(registry.catalog("hubspot").is_some());
        assert!(registry.catalog("stripe").is_some());
    }

    #[test]
    fn unknown_platform_names_known_ones() {
        let registry = ConnectorRegistry::builtin().unwrap();
        let err = registry
            .create("salesforce", &CredentialMap::new(), &ConnectorSettings::default())
            .err()
            .unwrap();
        assert_eq!(err.code, "UNKNOWN_PLATFORM");
        assert!(err.message.contains("hubspot"));
        assert!(err.message.contains("stripe"));
    }

    #[test]
    fn create_runs_platform_credential_validation() {
        let registry = ConnectorRegistry::builtin().unwrap();
        let err = registry
            .create("stripe", &CredentialMap::new(), &ConnectorSettings::default())
            .err()
            .unwrap();
        assert_eq!(err.code, "MISSING_CREDENTIAL");

        let creds: CredentialMap =
            [("secret_key".to_string(), json!("sk_test_1"))].into_iter().collect();
        let connector = registry
            .create("stripe", &creds, &ConnectorSettings::default())
            .unwrap();
        assert_eq!(connector.platform(), "stripe");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ConnectorRegistry::builtin().unwrap();
        let catalog =
            EndpointCatalog::new(vec![EndpointDescriptor::new("x", "/x", "x")]).unwrap();
        let err = registry
            .register(
                "stripe",
                catalog,
                Box::new(|_, _| Err(ConnectorError::internal("NEVER", "unused"))),
            )
            .unwrap_err();
        assert_eq!(err.code, "DUPLICATE_PLATFORM");
    }

    #[test]
    fn cyclic_catalog_cannot_reach_registration() {
        // EndpointCatalog::new is the only way to build a catalog, and it
        // rejects cycles, so register() can never accept one.
        let err = EndpointCatalog::new(vec![
            EndpointDescriptor::new("a", "/a", "a").depends_on(&["b"]),
            EndpointDescriptor::new("b", "/b", "b").depends_on(&["a"]),
        ])
        .unwrap_err();
        assert_eq!(err.code, "DEPENDENCY_CYCLE");
    }
}
