//! Job execution model: configuration, progress counters, and statuses.

use serde::{Deserialize, Serialize};

/// Default retry budget for transient endpoint failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Terminal and non-terminal states of one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the wire-format string produced by [`JobStatus::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partially_completed" => Some(Self::PartiallyCompleted),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the job can no longer change state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-endpoint outcome within one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
    /// A dependency failed or was itself skipped.
    Skipped,
}

impl StepStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run limits handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Endpoint names to process. Empty means the source's selection.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Retry budget for transient endpoint failures.
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Progress counters for one job run.
///
/// `percent_complete` is `completed_steps / total_steps` and is
/// monotonically non-decreasing within a run: completed counters only
/// ever increment, and failures never subtract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub total_steps: u32,
    pub completed_steps: u32,
    pub failed_steps: u32,
    pub skipped_steps: u32,
    pub records_processed: u64,
    pub data_size_bytes: u64,
    pub percent_complete: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobProgress {
    /// Fresh progress for a run over `total_steps` endpoints.
    #[must_use]
    pub fn new(total_steps: u32) -> Self {
        Self {
            total_steps,
            ..Self::default()
        }
    }

    /// Record one successfully completed endpoint.
    pub fn record_success(&mut self, records: u64, bytes: u64) {
        self.completed_steps += 1;
        self.records_processed += records;
        self.data_size_bytes += bytes;
        self.recompute_percent();
    }

    /// Record one failed endpoint.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed_steps += 1;
        self.error_message = Some(error.into());
        self.recompute_percent();
    }

    /// Record one skipped endpoint.
    pub fn record_skip(&mut self) {
        self.skipped_steps += 1;
        self.recompute_percent();
    }

    fn recompute_percent(&mut self) {
        if self.total_steps > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = self.completed_steps as f32 / self.total_steps as f32 * 100.0;
            self.percent_complete = pct;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_as_str_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::PartiallyCompleted,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::PartiallyCompleted.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn job_config_defaults() {
        let cfg = JobConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert!(cfg.endpoints.is_empty());
    }

    #[test]
    fn progress_percent_tracks_completed_only() {
        let mut p = JobProgress::new(4);
        assert!((p.percent_complete - 0.0).abs() < f32::EPSILON);

        p.record_success(100, 2048);
        assert!((p.percent_complete - 25.0).abs() < 0.01);

        p.record_failure("boom");
        assert!((p.percent_complete - 25.0).abs() < 0.01);

        p.record_skip();
        assert!((p.percent_complete - 25.0).abs() < 0.01);

        p.record_success(50, 1024);
        assert!((p.percent_complete - 50.0).abs() < 0.01);
        assert_eq!(p.records_processed, 150);
        assert_eq!(p.data_size_bytes, 3072);
    }

    #[test]
    fn progress_is_monotonic_under_mixed_outcomes() {
        let mut p = JobProgress::new(3);
        let mut last = p.percent_complete;
        p.record_success(10, 100);
        assert!(p.percent_complete >= last);
        last = p.percent_complete;
        p.record_failure("transient exhausted");
        assert!(p.percent_complete >= last);
        last = p.percent_complete;
        p.record_success(10, 100);
        assert!(p.percent_complete >= last);
    }

    #[test]
    fn zero_total_steps_keeps_percent_zero() {
        let mut p = JobProgress::new(0);
        p.record_skip();
        assert!((p.percent_complete - 0.0).abs() < f32::EPSILON);
    }
}
