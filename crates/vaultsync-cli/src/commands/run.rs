use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use vaultsync_connectors::ConnectorRegistry;
use vaultsync_engine::config::{parser, validator};
use vaultsync_engine::{CancellationToken, Orchestrator, StaticCredentials};
use vaultsync_state::SqliteStateBackend;
use vaultsync_types::job::JobStatus;

/// Execute the `run` command: parse, validate, and run a backup job.
pub async fn execute(config_path: &Path) -> Result<()> {
    // 1. Parse source YAML
    let config = parser::parse_source(config_path)
        .with_context(|| format!("Failed to parse source config: {}", config_path.display()))?;

    // 2. Validate
    let registry = Arc::new(ConnectorRegistry::builtin()?);
    validator::validate_source(&config, &registry)?;

    tracing::info!(
        source = config.source,
        platform = config.platform,
        endpoints = config.endpoints.len(),
        incremental = config.incremental,
        "Source validated"
    );

    // 3. Run
    let state = Arc::new(
        SqliteStateBackend::open(&config.state_path)
            .with_context(|| format!("Failed to open state db: {}", config.state_path.display()))?,
    );
    let orchestrator = Orchestrator::new(
        registry,
        state.clone(),
        state,
        Arc::new(StaticCredentials::new(config.credentials.clone())),
    );

    let source = config.to_source();
    let job_config = config.job_config();
    let result = orchestrator
        .run_job(&source, &job_config, &CancellationToken::new())
        .await?;

    println!("Job #{} finished: {}", result.job_id, result.status);
    println!(
        "  Endpoints:   {} total, {} completed, {} failed, {} skipped",
        result.progress.total_steps,
        result.progress.completed_steps,
        result.progress.failed_steps,
        result.progress.skipped_steps,
    );
    println!("  Records:     {}", result.progress.records_processed);
    println!("  Data size:   {}", format_bytes(result.progress.data_size_bytes));
    println!("  Duration:    {:.2}s", result.duration_secs);
    for report in &result.endpoints {
        let detail = report
            .error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default();
        println!(
            "    {:16} {:9} {:>8} records  {:>10}{}",
            report.endpoint,
            report.status.as_str(),
            report.records,
            format_bytes(report.bytes),
            detail,
        );
    }

    if result.status == JobStatus::Failed {
        anyhow::bail!(
            "job failed: {}",
            result
                .progress
                .error_message
                .unwrap_or_else(|| "unknown error".into())
        );
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let b = bytes as f64;
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", b / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", b / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.2} KB", b / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
