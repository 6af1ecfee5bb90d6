//! Credential alias resolution and auth header injection.
//!
//! Connections created through different onboarding flows stored the
//! same secret under different field names. Each connector declares its
//! accepted aliases in priority order; resolution either returns the
//! first match or fails with a configuration error naming every
//! accepted alias. There is no built-in default credential.

use std::collections::BTreeMap;

use vaultsync_types::error::ConnectorError;
use vaultsync_types::platform::{AuthConfig, AuthStyle};

/// Raw secret fields as returned by the credential resolver.
pub type CredentialMap = BTreeMap<String, serde_json::Value>;

/// Resolve a string-valued field by trying `aliases` in priority order.
///
/// Returns the matched alias alongside the value. Non-string and empty
/// values are treated as absent.
#[must_use]
pub fn resolve_field<'a>(
    credentials: &'a CredentialMap,
    aliases: &[&'a str],
) -> Option<(&'a str, &'a str)> {
    for alias in aliases {
        if let Some(serde_json::Value::String(value)) = credentials.get(*alias) {
            if !value.is_empty() {
                return Some((*alias, value.as_str()));
            }
        }
    }
    None
}

/// Resolve a required string field or fail with a configuration error
/// listing every accepted alias.
///
/// # Errors
///
/// Returns `ConnectorError::configuration` (code `MISSING_CREDENTIAL`)
/// when none of the aliases is present.
pub fn require_field<'a>(
    credentials: &'a CredentialMap,
    aliases: &[&'a str],
    platform: &str,
) -> Result<(&'a str, &'a str), ConnectorError> {
    resolve_field(credentials, aliases).ok_or_else(|| {
        ConnectorError::configuration(
            "MISSING_CREDENTIAL",
            format!(
                "no credential found for {platform}; accepted fields: {}",
                aliases.join(", ")
            ),
        )
    })
}

/// Inject the resolved credentials into an outgoing request.
///
/// Applied to every request a connector issues, never mutated mid-fetch.
#[must_use]
pub fn apply_auth(
    request: reqwest::RequestBuilder,
    auth: &AuthConfig,
) -> reqwest::RequestBuilder {
    match auth {
        AuthConfig::ApiKey {
            key,
            style: AuthStyle::Bearer,
        } => request.bearer_auth(key),
        AuthConfig::ApiKey {
            key,
            style: AuthStyle::CustomHeader { header },
        } => request.header(header.as_str(), key),
        AuthConfig::Basic { username, password } => {
            request.basic_auth(username, Some(password))
        }
        AuthConfig::OAuth { access_token } => request.bearer_auth(access_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultsync_types::error::ErrorCategory;

    fn creds(pairs: &[(&str, serde_json::Value)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn first_alias_wins() {
        let map = creds(&[
            ("api_key", json!("second")),
            ("access_token", json!("first")),
        ]);
        let (alias, value) = resolve_field(&map, &["access_token", "api_key"]).unwrap();
        assert_eq!(alias, "access_token");
        assert_eq!(value, "first");
    }

    #[test]
    fn alternate_alias_resolves() {
        let map = creds(&[("hapikey", json!("pat-abc"))]);
        let (alias, value) =
            resolve_field(&map, &["access_token", "api_key", "hapikey"]).unwrap();
        assert_eq!(alias, "hapikey");
        assert_eq!(value, "pat-abc");
    }

    #[test]
    fn non_string_and_empty_values_are_absent() {
        let map = creds(&[("access_token", json!(42)), ("api_key", json!(""))]);
        assert!(resolve_field(&map, &["access_token", "api_key"]).is_none());
    }

    #[test]
    fn empty_map_lists_accepted_aliases() {
        let map = CredentialMap::new();
        let err = require_field(&map, &["secret_key", "api_key", "sk"], "stripe").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Configuration);
        assert_eq!(err.code, "MISSING_CREDENTIAL");
        for alias in ["secret_key", "api_key", "sk"] {
            assert!(err.message.contains(alias), "missing alias {alias} in: {}", err.message);
        }
    }
}
