//! HubSpot CRM connector.
//!
//! Auth: private-app tokens (`pat-…`) or OAuth access tokens, both sent
//! as a bearer header. HubSpot allows roughly ten requests per second
//! per token, so pages are spaced ~110 ms apart.

use std::time::Duration;

use async_trait::async_trait;

use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;
use vaultsync_types::platform::{AuthConfig, AuthStyle};
use vaultsync_types::record::FetchOutput;

use crate::auth::{require_field, CredentialMap};
use crate::catalog::EndpointCatalog;
use crate::connector::Connector;
use crate::fetch::{FetchEngine, DEFAULT_TIMEOUT_SECS};
use crate::registry::ConnectorSettings;

/// Registry key for this platform.
pub const PLATFORM: &str = "hubspot";

const BASE_URL: &str = "https://api.hubapi.com";

/// Inter-request delay tuned to HubSpot's published burst limits.
const RATE_LIMIT_MS: u64 = 110;

/// Credential field names in priority order. Connections created by the
/// OAuth flow store `access_token`; older api-key onboarding flows used
/// the other names.
pub const CREDENTIAL_ALIASES: &[&str] = &["access_token", "api_key", "hapikey", "token"];

/// Cheap authenticated endpoint used by `test()`.
const TEST_PATH: &str = "/account-info/v3/details";

/// HubSpot CRM connector.
pub struct HubSpotConnector {
    engine: FetchEngine,
    catalog: EndpointCatalog,
}

impl HubSpotConnector {
    /// Build a connector against the production HubSpot API.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` when no accepted
    /// credential field is present or the key fails shape validation.
    pub fn from_credentials(credentials: &CredentialMap) -> Result<Self, ConnectorError> {
        Self::build(credentials, BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a connector with job-level settings (request timeout).
    ///
    /// # Errors
    ///
    /// Same conditions as [`HubSpotConnector::from_credentials`].
    pub fn with_settings(
        credentials: &CredentialMap,
        settings: &ConnectorSettings,
    ) -> Result<Self, ConnectorError> {
        Self::build(credentials, BASE_URL, settings.request_timeout)
    }

    /// Build a connector against a custom base URL (private API proxies,
    /// tests).
    ///
    /// # Errors
    ///
    /// Same conditions as [`HubSpotConnector::from_credentials`].
    pub fn with_base_url(
        credentials: &CredentialMap,
        base_url: &str,
    ) -> Result<Self, ConnectorError> {
        Self::build(credentials, base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn build(
        credentials: &CredentialMap,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let auth = resolve_auth(credentials)?;
        let engine = FetchEngine::new(
            base_url,
            auth,
            Duration::from_millis(RATE_LIMIT_MS),
            request_timeout,
        )?;
        Ok(Self {
            engine,
            catalog: catalog()?,
        })
    }
}

/// Resolve HubSpot credentials from their historical field aliases.
///
/// Private-app tokens (`pat-…`) arrive under any alias; legacy api-key
/// aliases must carry the `pat-` prefix since standalone API keys were
/// retired. Anything else under `access_token`/`token` is treated as an
/// OAuth access token.
///
/// # Errors
///
/// Returns `ConnectorError::configuration` listing the accepted aliases
/// when no field matches, or `BAD_KEY_FORMAT` on a malformed key.
pub fn resolve_auth(credentials: &CredentialMap) -> Result<AuthConfig, ConnectorError> {
    let (alias, key) = require_field(credentials, CREDENTIAL_ALIASES, PLATFORM)?;

    if key.chars().any(char::is_whitespace) {
        return Err(ConnectorError::configuration(
            "BAD_KEY_FORMAT",
            format!("hubspot credential '{alias}' contains whitespace"),
        ));
    }

    if key.starts_with("pat-") {
        return Ok(AuthConfig::ApiKey {
            key: key.to_string(),
            style: AuthStyle::Bearer,
        });
    }

    if matches!(alias, "api_key" | "hapikey") {
        return Err(ConnectorError::configuration(
            "BAD_KEY_FORMAT",
            format!("hubspot credential '{alias}' must be a private-app token starting with 'pat-'"),
        ));
    }

    Ok(AuthConfig::OAuth {
        access_token: key.to_string(),
    })
}

/// The fixed HubSpot endpoint catalog.
///
/// # Errors
///
/// Catalog validation failure; impossible for this static definition but
/// surfaced so registration can reject bad edits.
pub fn catalog() -> Result<EndpointCatalog, ConnectorError> {
    EndpointCatalog::new(vec![
        EndpointDescriptor::new("contacts", "/crm/v3/objects/contacts", "CRM contact records")
            .paginated("limit", "after")
            .entity_key("results")
            .incremental("updatedAfter", "updatedAt")
            .id_field("id")
            .extra_param("archived", "false"),
        EndpointDescriptor::new("companies", "/crm/v3/objects/companies", "CRM company records")
            .paginated("limit", "after")
            .entity_key("results")
            .incremental("updatedAfter", "updatedAt")
            .id_field("id")
            .extra_param("archived", "false"),
        EndpointDescriptor::new("deals", "/crm/v3/objects/deals", "CRM deal records")
            .paginated("limit", "after")
            .entity_key("results")
            .incremental("updatedAfter", "updatedAt")
            .id_field("id")
            .depends_on(&["contacts", "companies"]),
        EndpointDescriptor::new("tickets", "/crm/v3/objects/tickets", "Service tickets")
            .paginated("limit", "after")
            .entity_key("results")
            .incremental("updatedAfter", "updatedAt")
            .id_field("id")
            .depends_on(&["contacts"]),
        EndpointDescriptor::new("owners", "/crm/v3/owners", "Record owners")
            .paginated("limit", "after")
            .entity_key("results")
            .id_field("id"),
    ])
}

#[async_trait]
impl Connector for HubSpotConnector {
    fn name(&self) -> &str {
        "HubSpot"
    }

    fn platform(&self) -> &str {
        PLATFORM
    }

    fn endpoints(&self) -> &[EndpointDescriptor] {
        self.catalog.as_slice()
    }

    async fn test(&self) -> Result<(), ConnectorError> {
        self.engine.probe(TEST_PATH).await
    }

    async fn fetch(
        &self,
        endpoint: &EndpointDescriptor,
        since: Option<&str>,
    ) -> Result<FetchOutput, ConnectorError> {
        self.engine.fetch_endpoint(endpoint, since).await
    }
}
