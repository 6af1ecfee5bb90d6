//! State backend trait definition.
//!
//! [`StateBackend`] defines the storage contract for watermarks and job
//! run tracking. Model types live in `vaultsync_types`.

use vaultsync_types::ids::{EndpointName, SourceId};
use vaultsync_types::job::{JobProgress, JobStatus};
use vaultsync_types::watermark::WatermarkState;

use crate::error;

/// A persisted job run row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: i64,
    pub source: SourceId,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// ISO-8601 UTC start timestamp.
    pub started_at: String,
    /// ISO-8601 UTC finish timestamp, set once the job is terminal.
    pub finished_at: Option<String>,
}

/// Storage contract for watermarks and job runs.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateBackend>`.
pub trait StateBackend: Send + Sync {
    /// Read the persisted watermark for a (source, endpoint) pair.
    ///
    /// Returns `Ok(None)` when no watermark has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn load_watermark(
        &self,
        source: &SourceId,
        endpoint: &EndpointName,
    ) -> error::Result<Option<WatermarkState>>;

    /// Upsert the watermark for a (source, endpoint) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn save_watermark(
        &self,
        source: &SourceId,
        endpoint: &EndpointName,
        watermark: &WatermarkState,
    ) -> error::Result<()>;

    /// Begin a new job run in `pending` state, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn create_job(&self, source: &SourceId) -> error::Result<i64>;

    /// Update a job's status and progress counters. Terminal statuses
    /// also stamp the finish time.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn update_job(
        &self,
        job_id: i64,
        status: JobStatus,
        progress: &JobProgress,
    ) -> error::Result<()>;

    /// Fetch a job run by ID. Returns `Ok(None)` for unknown IDs.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn get_job(&self, job_id: i64) -> error::Result<Option<JobRecord>>;
}
