//! Job run reports.

use serde::{Deserialize, Serialize};

use vaultsync_types::job::{JobProgress, JobStatus, StepStatus};

/// Outcome of one endpoint within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointReport {
    pub endpoint: String,
    pub status: StepStatus,
    /// Fetch attempts made, including the first.
    pub attempts: u32,
    pub records: u64,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EndpointReport {
    /// Report for an endpoint skipped because a dependency did not succeed.
    #[must_use]
    pub fn skipped(endpoint: impl Into<String>, dependency: &str) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: StepStatus::Skipped,
            attempts: 0,
            records: 0,
            bytes: 0,
            error: Some(format!("dependency '{dependency}' did not succeed")),
        }
    }
}

/// Final report of one job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: i64,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub endpoints: Vec<EndpointReport>,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_report_names_dependency() {
        let report = EndpointReport::skipped("orders", "contacts");
        assert_eq!(report.status, StepStatus::Skipped);
        assert_eq!(report.attempts, 0);
        assert!(report.error.unwrap().contains("contacts"));
    }

    #[test]
    fn result_serde_roundtrip() {
        let result = JobResult {
            job_id: 7,
            status: JobStatus::PartiallyCompleted,
            progress: JobProgress::new(3),
            endpoints: vec![EndpointReport::skipped("orders", "contacts")],
            duration_secs: 1.5,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: JobResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
