use anyhow::Result;

use vaultsync_connectors::ConnectorRegistry;

/// Execute the `endpoints` command: print a platform's endpoint catalog.
pub fn execute(platform: &str) -> Result<()> {
    let registry = ConnectorRegistry::builtin()?;
    let Some(catalog) = registry.catalog(platform) else {
        anyhow::bail!(
            "unknown platform '{}'; known platforms: {}",
            platform,
            registry.platforms().join(", ")
        );
    };

    println!("Endpoints for '{platform}':");
    for ep in catalog.as_slice() {
        println!("  {:12} {}", ep.name, ep.description);
        println!(
            "               path: {}  paginated: {}  incremental: {}  default: {}",
            ep.path,
            if ep.is_paginated() { "yes" } else { "no" },
            if ep.supports_incremental { "yes" } else { "no" },
            if ep.enabled_by_default { "yes" } else { "no" },
        );
        if !ep.dependencies.is_empty() {
            println!("               depends on: {}", ep.dependencies.join(", "));
        }
    }
    Ok(())
}
