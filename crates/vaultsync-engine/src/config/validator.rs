//! Structural validation of source configurations.

use anyhow::Result;

use vaultsync_connectors::ConnectorRegistry;

use crate::config::types::SourceConfig;

/// Retry budgets above this are almost certainly a typo.
const MAX_RETRY_LIMIT: u32 = 10;

/// Validate a source config against the platform registry.
///
/// Checks structure only; credential shape validation happens in the
/// connector and connectivity in `check`/`run`.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn validate_source(config: &SourceConfig, registry: &ConnectorRegistry) -> Result<()> {
    if config.source.trim().is_empty() {
        anyhow::bail!("source name must not be empty");
    }

    let Some(catalog) = registry.catalog(&config.platform) else {
        anyhow::bail!(
            "unknown platform '{}'; known platforms: {}",
            config.platform,
            registry.platforms().join(", ")
        );
    };

    for endpoint in &config.endpoints {
        if catalog.get(endpoint).is_none() {
            anyhow::bail!(
                "endpoint '{}' is not in the '{}' catalog",
                endpoint,
                config.platform
            );
        }
    }

    if config.max_retries > MAX_RETRY_LIMIT {
        anyhow::bail!("max_retries must be at most {MAX_RETRY_LIMIT}");
    }
    if config.request_timeout_secs == 0 {
        anyhow::bail!("request_timeout_secs must be positive");
    }

    Ok(())
}
