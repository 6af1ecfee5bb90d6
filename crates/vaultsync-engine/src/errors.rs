//! Job error model and retry backoff policy helpers.

use std::time::Duration;

use vaultsync_types::error::{BackoffClass, ConnectorError};

const BACKOFF_FAST_BASE_MS: u64 = 100;
const BACKOFF_NORMAL_BASE_MS: u64 = 1_000;
const BACKOFF_SLOW_BASE_MS: u64 = 5_000;
const BACKOFF_MAX_MS: u64 = 60_000;

/// Categorized job error for retry decisions.
///
/// `Connector` wraps a typed [`ConnectorError`] with retry metadata.
/// `Infrastructure` wraps opaque host-side errors (state backend,
/// blocking-task panics) that are never retryable.
#[derive(Debug)]
pub enum JobError {
    /// Typed connector error with retry metadata.
    Connector(ConnectorError),
    /// Infrastructure error (state backend, task join, etc.)
    Infrastructure(anyhow::Error),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connector(e) => write!(f, "{e}"),
            Self::Infrastructure(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for JobError {}

impl From<anyhow::Error> for JobError {
    fn from(e: anyhow::Error) -> Self {
        Self::Infrastructure(e)
    }
}

impl From<ConnectorError> for JobError {
    fn from(e: ConnectorError) -> Self {
        Self::Connector(e)
    }
}

impl JobError {
    /// Returns `true` if this is a typed connector error marked retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connector(e) => e.retryable,
            Self::Infrastructure(_) => false,
        }
    }

    /// Returns the typed connector error if this is a `Connector` variant.
    #[must_use]
    pub fn as_connector_error(&self) -> Option<&ConnectorError> {
        match self {
            Self::Connector(e) => Some(e),
            Self::Infrastructure(_) => None,
        }
    }
}

/// Compute retry delay based on error hints and attempt number.
pub(crate) fn compute_backoff(err: &ConnectorError, attempt: u32) -> Duration {
    // If the provider specified a retry-after, use it
    if let Some(ms) = err.retry_after_ms {
        return Duration::from_millis(ms);
    }

    // Exponential backoff based on backoff_class
    let base_ms: u64 = match err.backoff_class {
        BackoffClass::Fast => BACKOFF_FAST_BASE_MS,
        BackoffClass::Normal => BACKOFF_NORMAL_BASE_MS,
        BackoffClass::Slow => BACKOFF_SLOW_BASE_MS,
    };

    let delay_ms = base_ms.saturating_mul(2u64.pow(attempt.saturating_sub(1)));
    Duration::from_millis(delay_ms.min(BACKOFF_MAX_MS))
}
