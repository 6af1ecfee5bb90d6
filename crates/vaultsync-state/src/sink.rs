//! Record sink trait definition.

use async_trait::async_trait;

use vaultsync_types::ids::EndpointName;
use vaultsync_types::record::RawRecord;

use crate::error;

/// Destination for backed-up records.
///
/// Records are committed once per endpoint, never atomically per job:
/// a partially completed job retains every completed endpoint's data.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one endpoint's records for a job. Returns the count written.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure; the
    /// whole batch is rolled back.
    async fn persist_records(
        &self,
        job_id: i64,
        endpoint: &EndpointName,
        records: &[RawRecord],
    ) -> error::Result<u64>;
}
