use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use vaultsync_connectors::{ConnectorRegistry, ConnectorSettings};
use vaultsync_engine::config::{parser, validator};
use vaultsync_state::SqliteStateBackend;

/// Execute the `check` command: validate source config and connectivity.
pub async fn execute(config_path: &Path) -> Result<()> {
    // 1. Parse source YAML
    let config = parser::parse_source(config_path)
        .with_context(|| format!("Failed to parse source config: {}", config_path.display()))?;

    // 2. Validate structure
    let registry = Arc::new(ConnectorRegistry::builtin()?);
    validator::validate_source(&config, &registry)?;
    println!("Source structure:  OK");

    // 3. Construct the connector (credential shape) and test it (auth)
    let settings = ConnectorSettings {
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    };
    let connector_ok = match registry.create(&config.platform, &config.credentials, &settings) {
        Ok(connector) => match connector.test().await {
            Ok(()) => {
                println!("Connector test:    OK");
                true
            }
            Err(e) => {
                println!("Connector test:    FAILED");
                println!("  {e}");
                false
            }
        },
        Err(e) => {
            println!("Connector config:  FAILED");
            println!("  {e}");
            false
        }
    };

    // 4. State backend
    let state_ok = match SqliteStateBackend::open(&config.state_path) {
        Ok(_) => {
            println!("State backend:     OK");
            true
        }
        Err(e) => {
            println!("State backend:     FAILED");
            println!("  {e}");
            false
        }
    };

    if connector_ok && state_ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}
