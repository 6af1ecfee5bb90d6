//! Job orchestrator: resolves the connector, walks the dependency-ordered
//! endpoint set, and applies retry/partial-failure policy.
//!
//! One job processes its endpoints sequentially; independent jobs may run
//! concurrently as separate tasks since rate limiting is scoped to one
//! connector instance's HTTP client.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use vaultsync_connectors::auth::CredentialMap;
use vaultsync_connectors::{Connector, ConnectorRegistry, ConnectorSettings, EndpointCatalog};
use vaultsync_state::{RecordSink, StateBackend, StateError};
use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;
use vaultsync_types::ids::{ConnectionId, EndpointName, SourceId};
use vaultsync_types::job::{JobConfig, JobProgress, JobStatus, StepStatus};
use vaultsync_types::record::FetchOutput;
use vaultsync_types::source::Source;
use vaultsync_types::watermark::WatermarkState;

use crate::cancel::CancellationToken;
use crate::errors::{compute_backoff, JobError};
use crate::result::{EndpointReport, JobResult};

/// Supplier of raw credential fields for a platform connection.
///
/// Alias resolution lives in the connectors; this only hands back the
/// stored secret map.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Fetch the raw credential fields for a connection.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectorError`] when the connection is unknown or
    /// the secret store is unreachable.
    async fn get_credentials(
        &self,
        connection: &ConnectionId,
    ) -> Result<CredentialMap, ConnectorError>;
}

/// Credential resolver over a fixed in-memory map. Used by the CLI
/// (config-file credentials) and by tests.
pub struct StaticCredentials {
    credentials: CredentialMap,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(credentials: CredentialMap) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn get_credentials(
        &self,
        _connection: &ConnectionId,
    ) -> Result<CredentialMap, ConnectorError> {
        Ok(self.credentials.clone())
    }
}

/// Runs configured sources to completion.
pub struct Orchestrator {
    registry: Arc<ConnectorRegistry>,
    state: Arc<dyn StateBackend>,
    sink: Arc<dyn RecordSink>,
    credentials: Arc<dyn CredentialResolver>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        state: Arc<dyn StateBackend>,
        sink: Arc<dyn RecordSink>,
        credentials: Arc<dyn CredentialResolver>,
    ) -> Self {
        Self {
            registry,
            state,
            sink,
            credentials,
        }
    }

    /// Run one job for `source` to a terminal status.
    ///
    /// Systemic failures (bad configuration, rejected credentials) yield
    /// a `failed` result; per-endpoint failures degrade the job to
    /// `partially_completed` without aborting unrelated DAG branches.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Infrastructure`] only for state backend or
    /// task failures; connector-level outcomes are reported in the
    /// returned [`JobResult`].
    #[allow(clippy::too_many_lines)]
    pub async fn run_job(
        &self,
        source: &Source,
        config: &JobConfig,
        cancel: &CancellationToken,
    ) -> Result<JobResult, JobError> {
        let start = Instant::now();
        tracing::info!(
            source = %source.id,
            platform = %source.platform,
            "Starting backup job"
        );

        let job_id = {
            let source_id = source.id.clone();
            self.with_state(move |s| s.create_job(&source_id)).await?
        };

        let (connector, catalog, order) = match self.prepare(source, config).await {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::error!(job_id, error = %err, "Job setup failed");
                let mut progress = JobProgress::new(0);
                progress.error_message = Some(err.to_string());
                self.update(job_id, JobStatus::Failed, &progress).await?;
                return Ok(JobResult {
                    job_id,
                    status: JobStatus::Failed,
                    progress,
                    endpoints: Vec::new(),
                    duration_secs: start.elapsed().as_secs_f64(),
                });
            }
        };

        let total = u32::try_from(order.len()).unwrap_or(u32::MAX);
        let mut progress = JobProgress::new(total);
        self.update(job_id, JobStatus::Running, &progress).await?;

        let mut statuses: BTreeMap<String, StepStatus> = BTreeMap::new();
        let mut reports: Vec<EndpointReport> = Vec::new();
        let mut cancelled = false;

        for name in &order {
            // Cancellation is checked between endpoints, never mid-page.
            if cancel.is_cancelled() {
                tracing::info!(job_id, "Cancellation requested, stopping before next endpoint");
                cancelled = true;
                break;
            }

            let Some(descriptor) = catalog.get(name) else {
                continue;
            };

            if let Some(dep) = descriptor
                .dependencies
                .iter()
                .find(|d| statuses.get(d.as_str()) != Some(&StepStatus::Succeeded))
            {
                tracing::warn!(
                    job_id,
                    endpoint = %name,
                    dependency = %dep,
                    "Skipping endpoint, dependency did not succeed"
                );
                statuses.insert(name.clone(), StepStatus::Skipped);
                progress.record_skip();
                reports.push(EndpointReport::skipped(name.clone(), dep));
                self.update(job_id, JobStatus::Running, &progress).await?;
                continue;
            }

            progress.current_step = Some(name.clone());
            self.update(job_id, JobStatus::Running, &progress).await?;

            let since = if descriptor.supports_incremental && source.incremental {
                self.load_watermark(source.id.clone(), name.clone())
                    .await?
                    .and_then(|wm| wm.value)
            } else {
                None
            };

            let (outcome, attempts) =
                fetch_with_retry(connector.as_ref(), descriptor, since.as_deref(), config.max_retries)
                    .await;

            match outcome {
                Ok(output) => {
                    let report = self
                        .commit_endpoint(job_id, source, descriptor, output, attempts)
                        .await;
                    match report.status {
                        StepStatus::Succeeded => {
                            statuses.insert(name.clone(), StepStatus::Succeeded);
                            progress.record_success(report.records, report.bytes);
                        }
                        _ => {
                            statuses.insert(name.clone(), StepStatus::Failed);
                            progress.record_failure(
                                report.error.clone().unwrap_or_else(|| "persist failed".into()),
                            );
                        }
                    }
                    reports.push(report);
                }
                Err(err) if err.is_systemic() => {
                    // Credentials went bad mid-run: every remaining
                    // endpoint would fail identically.
                    tracing::error!(job_id, endpoint = %name, error = %err, "Systemic failure");
                    statuses.insert(name.clone(), StepStatus::Failed);
                    progress.record_failure(err.to_string());
                    progress.current_step = None;
                    reports.push(EndpointReport {
                        endpoint: name.clone(),
                        status: StepStatus::Failed,
                        attempts,
                        records: 0,
                        bytes: 0,
                        error: Some(err.to_string()),
                    });
                    self.update(job_id, JobStatus::Failed, &progress).await?;
                    return Ok(JobResult {
                        job_id,
                        status: JobStatus::Failed,
                        progress,
                        endpoints: reports,
                        duration_secs: start.elapsed().as_secs_f64(),
                    });
                }
                Err(err) => {
                    tracing::error!(
                        job_id,
                        endpoint = %name,
                        attempts,
                        error = %err,
                        "Endpoint fetch failed"
                    );
                    statuses.insert(name.clone(), StepStatus::Failed);
                    progress.record_failure(format!("endpoint '{name}': {err}"));
                    reports.push(EndpointReport {
                        endpoint: name.clone(),
                        status: StepStatus::Failed,
                        attempts,
                        records: 0,
                        bytes: 0,
                        error: Some(err.to_string()),
                    });
                }
            }

            progress.current_step = None;
            self.update(job_id, JobStatus::Running, &progress).await?;
        }

        let status = if cancelled {
            JobStatus::Cancelled
        } else if progress.failed_steps == 0 && progress.skipped_steps == 0 {
            JobStatus::Completed
        } else if progress.completed_steps > 0 {
            JobStatus::PartiallyCompleted
        } else {
            JobStatus::Failed
        };

        progress.current_step = None;
        self.update(job_id, status, &progress).await?;
        tracing::info!(
            job_id,
            status = %status,
            records = progress.records_processed,
            bytes = progress.data_size_bytes,
            "Backup job finished"
        );

        Ok(JobResult {
            job_id,
            status,
            progress,
            endpoints: reports,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Current progress of a job, pollable by any caller.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Infrastructure`] on state backend failure.
    pub async fn get_job_progress(&self, job_id: i64) -> Result<Option<JobProgress>, JobError> {
        let record = self.with_state(move |s| s.get_job(job_id)).await?;
        Ok(record.map(|r| r.progress))
    }

    /// Resolve credentials, build the connector, verify them with
    /// `test()`, and plan the endpoint execution order.
    async fn prepare(
        &self,
        source: &Source,
        config: &JobConfig,
    ) -> Result<(Box<dyn Connector>, EndpointCatalog, Vec<String>), ConnectorError> {
        let credentials = self.credentials.get_credentials(&source.connection_id).await?;
        let settings = ConnectorSettings {
            request_timeout: std::time::Duration::from_secs(config.request_timeout_secs),
        };
        let connector = self
            .registry
            .create(source.platform.as_str(), &credentials, &settings)?;
        connector.test().await?;

        let catalog = self
            .registry
            .catalog(source.platform.as_str())
            .cloned()
            .ok_or_else(|| {
                ConnectorError::configuration(
                    "UNKNOWN_PLATFORM",
                    format!("no catalog registered for platform '{}'", source.platform),
                )
            })?;

        let selected = if config.endpoints.is_empty() {
            if source.endpoints.is_empty() {
                catalog.default_selection()
            } else {
                source.endpoints.clone()
            }
        } else {
            config.endpoints.clone()
        };
        let order = catalog.execution_order(&selected)?;
        Ok((connector, catalog, order))
    }

    /// Persist one successful endpoint fetch and advance its watermark.
    ///
    /// Records commit per endpoint; the watermark is saved only after the
    /// records landed, so a sink failure cannot advance it past
    /// unpersisted data.
    async fn commit_endpoint(
        &self,
        job_id: i64,
        source: &Source,
        descriptor: &EndpointDescriptor,
        output: FetchOutput,
        attempts: u32,
    ) -> EndpointReport {
        let name = descriptor.name.clone();
        let record_count = output.records.len() as u64;

        if let Err(err) = self
            .sink
            .persist_records(job_id, &EndpointName::new(name.clone()), &output.records)
            .await
        {
            tracing::error!(job_id, endpoint = %name, error = %err, "Record persistence failed");
            return EndpointReport {
                endpoint: name.clone(),
                status: StepStatus::Failed,
                attempts,
                records: 0,
                bytes: 0,
                error: Some(format!("endpoint '{name}': persist failed: {err}")),
            };
        }

        if let Some(value) = output.watermark {
            let watermark = WatermarkState {
                field: descriptor.options.incremental_field.clone(),
                value: Some(value),
                updated_at: Utc::now().to_rfc3339(),
            };
            if let Err(err) = self
                .save_watermark(source.id.clone(), name.clone(), watermark)
                .await
            {
                // Data is safe; the next run refetches from the old
                // watermark.
                tracing::warn!(job_id, endpoint = %name, error = %err, "Watermark save failed");
            }
        }

        tracing::info!(
            job_id,
            endpoint = %name,
            records = record_count,
            bytes = output.bytes_fetched,
            pages = output.pages_fetched,
            attempts,
            "Endpoint completed"
        );
        EndpointReport {
            endpoint: name,
            status: StepStatus::Succeeded,
            attempts,
            records: record_count,
            bytes: output.bytes_fetched,
            error: None,
        }
    }

    async fn with_state<T, F>(&self, f: F) -> Result<T, JobError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StateBackend) -> Result<T, StateError> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || f(state.as_ref()))
            .await
            .map_err(|e| JobError::Infrastructure(anyhow::anyhow!("state task panicked: {e}")))?
            .map_err(|e| JobError::Infrastructure(e.into()))
    }

    async fn update(
        &self,
        job_id: i64,
        status: JobStatus,
        progress: &JobProgress,
    ) -> Result<(), JobError> {
        let progress = progress.clone();
        self.with_state(move |s| s.update_job(job_id, status, &progress))
            .await
    }

    async fn load_watermark(
        &self,
        source: SourceId,
        endpoint: String,
    ) -> Result<Option<WatermarkState>, JobError> {
        self.with_state(move |s| s.load_watermark(&source, &EndpointName::new(endpoint)))
            .await
    }

    async fn save_watermark(
        &self,
        source: SourceId,
        endpoint: String,
        watermark: WatermarkState,
    ) -> Result<(), JobError> {
        self.with_state(move |s| {
            s.save_watermark(&source, &EndpointName::new(endpoint), &watermark)
        })
        .await
    }
}

/// Fetch one endpoint, retrying transient failures with backoff.
///
/// Returns the outcome alongside the number of attempts made. Transient
/// categories retry up to `max_retries` times; everything else fails on
/// the first attempt.
async fn fetch_with_retry(
    connector: &dyn Connector,
    endpoint: &EndpointDescriptor,
    since: Option<&str>,
    max_retries: u32,
) -> (Result<FetchOutput, ConnectorError>, u32) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match connector.fetch(endpoint, since).await {
            Ok(output) => return (Ok(output), attempt),
            Err(err) if err.retryable && attempt <= max_retries => {
                let delay = compute_backoff(&err, attempt);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    endpoint = endpoint.name,
                    attempt,
                    max_retries,
                    delay_ms,
                    category = %err.category,
                    code = %err.code,
                    "Retryable error, will retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return (Err(err), attempt),
        }
    }
}
