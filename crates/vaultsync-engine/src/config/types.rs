//! Source configuration file model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use vaultsync_connectors::auth::CredentialMap;
use vaultsync_types::job::{JobConfig, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS};
use vaultsync_types::source::{BackupFrequency, Source};

/// One source config file: platform, credentials, and run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source name; doubles as its identifier.
    pub source: String,
    /// Platform-type key (e.g. `"hubspot"`).
    pub platform: String,
    /// Raw credential fields; alias resolution happens in the connector.
    #[serde(default)]
    pub credentials: CredentialMap,
    /// Endpoints to back up. Empty means the platform catalog defaults.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Use persisted watermarks for delta fetches where supported.
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub frequency: BackupFrequency,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Path of the SQLite state database.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Free-form per-source parameters forwarded to the connector.
    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,
}

fn default_retention_days() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_state_path() -> PathBuf {
    PathBuf::from("vaultsync-state.db")
}

impl SourceConfig {
    /// Materialize the [`Source`] this config describes. The connection
    /// is inline (credentials live in the config file), so its ID is
    /// derived from the source name.
    #[must_use]
    pub fn to_source(&self) -> Source {
        let mut source = Source::new(
            self.source.clone(),
            self.source.clone(),
            self.platform.clone(),
            format!("{}-inline", self.source),
        );
        source.endpoints = self.endpoints.clone();
        source.incremental = self.incremental;
        source.frequency = self.frequency;
        source.retention_days = self.retention_days;
        source.custom_params = self
            .custom_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        source
    }

    /// Per-run limits derived from this config.
    #[must_use]
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            endpoints: Vec::new(),
            max_retries: self.max_retries,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "source: acme\nplatform: stripe\n";
        let config: SourceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.retention_days, 30);
        assert!(!config.incremental);
        assert_eq!(config.state_path, PathBuf::from("vaultsync-state.db"));
    }

    #[test]
    fn to_source_copies_settings() {
        let yaml = r"
source: acme
platform: hubspot
endpoints: [contacts, deals]
incremental: true
frequency: weekly
";
        let config: SourceConfig = serde_yaml::from_str(yaml).unwrap();
        let source = config.to_source();
        assert_eq!(source.id.as_str(), "acme");
        assert_eq!(source.platform.as_str(), "hubspot");
        assert_eq!(source.endpoints, vec!["contacts", "deals"]);
        assert!(source.incremental);
        assert_eq!(source.frequency, BackupFrequency::Weekly);
        assert_eq!(source.connection_id.as_str(), "acme-inline");
    }

    #[test]
    fn credentials_accept_arbitrary_fields() {
        let yaml = r"
source: acme
platform: stripe
credentials:
  secret_key: sk_test_1
  account: acct_42
";
        let config: SourceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.credentials["secret_key"], serde_json::json!("sk_test_1"));
        assert_eq!(config.credentials["account"], serde_json::json!("acct_42"));
    }
}
