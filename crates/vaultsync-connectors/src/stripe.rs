//! Stripe payments connector.
//!
//! Auth: secret or restricted API keys sent as a bearer header. Stripe
//! allows ~25 read requests per second in live mode; pages are spaced
//! ~120 ms apart to stay well inside that.

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
pub const PLATFORM: &str = "stripe";

const BASE_URL: &str = "https://api.stripe.com";

const RATE_LIMIT_MS: u64 = 120;

/// Credential field names in priority order.
pub const CREDENTIAL_ALIASES: &[&str] = &["secret_key", "api_key", "sk"];

/// Cheap authenticated endpoint used by `test()`.
const TEST_PATH: &str = "/v1/balance";

/// Stripe payments connector.
pub struct StripeConnector {
    engine: FetchEngine,
    catalog: EndpointCatalog,
}

impl StripeConnector {
    /// Build a connector against the production Stripe API.
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
    /// Same conditions as [`StripeConnector::from_credentials`].
    pub fn with_settings(
        credentials: &CredentialMap,
        settings: &ConnectorSettings,
    ) -> Result<Self, ConnectorError> {
        Self::build(credentials, BASE_URL, settings.request_timeout)
    }

    /// Build a connector against a custom base URL (tests).
    ///
    /// # Errors
    ///
    /// Same conditions as [`StripeConnector::from_credentials`].
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

/// Resolve Stripe credentials from their field aliases.
///
/// Keys must carry the `sk_` (secret) or `rk_` (restricted) prefix;
/// validation happens before any network call.
///
/// # Errors
///
/// Returns `ConnectorError::configuration` listing the accepted aliases
/// when no field matches, or `BAD_KEY_FORMAT` on a malformed key.
pub fn resolve_auth(credentials: &CredentialMap) -> Result<AuthConfig, ConnectorError> {
    let (alias, key) = require_field(credentials, CREDENTIAL_ALIASES, PLATFORM)?;

    if !(key.starts_with("sk_") || key.starts_with("rk_")) {
        return Err(ConnectorError::configuration(
            "BAD_KEY_FORMAT",
            format!("stripe credential '{alias}' must start with 'sk_' or 'rk_'"),
        ));
    }

    Ok(AuthConfig::ApiKey {
        key: key.to_string(),
        style: AuthStyle::Bearer,
    })
}

/// The fixed Stripe endpoint catalog.
///
/// # Errors
///
/// Catalog validation failure; impossible for this static definition but
/// surfaced so registration can reject bad edits.
pub fn catalog() -> Result<EndpointCatalog, ConnectorError> {
    EndpointCatalog::new(vec![
        EndpointDescriptor::new("customers", "/v1/customers", "Customer records")
            .paginated("limit", "offset")
            .entity_key("data")
            .incremental("created[gte]", "created")
            .id_field("id"),
        EndpointDescriptor::new("charges", "/v1/charges", "Charge records")
            .paginated("limit", "offset")
            .entity_key("data")
            .incremental("created[gte]", "created")
            .id_field("id")
            .depends_on(&["customers"]),
        EndpointDescriptor::new("invoices", "/v1/invoices", "Invoice records")
            .paginated("limit", "offset")
            .entity_key("data")
            .incremental("created[gte]", "created")
            .id_field("id")
            .depends_on(&["customers"]),
        EndpointDescriptor::new("refunds", "/v1/refunds", "Refund records")
            .paginated("limit", "offset")
            .entity_key("data")
            .incremental("created[gte]", "created")
            .id_field("id")
            .depends_on(&["charges"]),
        EndpointDescriptor::new("payouts", "/v1/payouts", "Payout records")
            .paginated("limit", "offset")
            .entity_key("data")
            .incremental("created[gte]", "created")
            .id_field("id"),
    ])
}

#[async_trait]
impl Connector for StripeConnector {
    fn name(&self) -> &str {
        "Stripe"
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultsync_types::platform::AuthType;

    fn creds(pairs: &[(&str, &str)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn secret_key_resolves() {
        let auth = resolve_auth(&creds(&[("secret_key", "sk_live_abc")])).unwrap();
        assert_eq!(auth.auth_type(), AuthType::ApiKey);
    }

    #[test]
    fn restricted_key_accepted_under_alternate_alias() {
        let auth = resolve_auth(&creds(&[("sk", "rk_test_xyz")])).unwrap();
        assert_eq!(auth.auth_type(), AuthType::ApiKey);
    }

    #[test]
    fn publishable_key_rejected_before_any_network_call() {
        let err = resolve_auth(&creds(&[("api_key", "pk_live_visible")])).unwrap_err();
        assert_eq!(err.code, "BAD_KEY_FORMAT");
    }

    #[test]
    fn empty_credentials_list_all_aliases() {
        let err = resolve_auth(&CredentialMap::new()).unwrap_err();
        assert_eq!(err.code, "MISSING_CREDENTIAL");
        for alias in CREDENTIAL_ALIASES {
            assert!(err.message.contains(alias));
        }
    }

    #[test]
    fn catalog_orders_refunds_after_charges() {
        let cat = catalog().unwrap();
        let order = cat.execution_order(&["refunds".into()]).unwrap();
        assert_eq!(order, vec!["customers", "charges", "refunds"]);
    }

    #[test]
    fn connector_reports_identity() {
        let connector =
            StripeConnector::from_credentials(&creds(&[("secret_key", "sk_test_123")])).unwrap();
        assert_eq!(connector.name(), "Stripe");
        assert_eq!(connector.platform(), "stripe");
        assert_eq!(connector.endpoints().len(), 5);
    }
}
