//! Structured error model for connector operations.
//!
//! [`ConnectorError`] carries classification and retry metadata so the
//! orchestrator can decide between retrying, failing one endpoint, or
//! failing the whole job. Construct via category-specific factory methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a connector error.
///
/// Determines default retry behavior and how far the failure propagates:
/// `Auth` and `Configuration` are systemic (the whole job fails), the
/// rest are scoped to a single endpoint fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing/invalid credentials or catalog configuration.
    Configuration,
    /// Authentication rejected by the provider (401/403).
    Auth,
    /// Provider rate limit exceeded (retryable).
    RateLimit,
    /// Timeout, connection reset, or 5xx (retryable).
    TransientNetwork,
    /// Response did not match the expected envelope shape.
    DataShape,
    /// Operator-requested cancellation.
    Cancelled,
    /// Internal engine error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::TransientNetwork => "transient_network",
            Self::DataShape => "data_shape",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Retry backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffClass {
    /// Millisecond-scale retry.
    Fast,
    /// Second-scale retry.
    Normal,
    /// Minute-scale retry.
    Slow,
}

/// Structured error from a connector operation.
///
/// Carries classification and retry metadata. Construct via
/// category-specific factory methods (e.g., [`ConnectorError::configuration`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct ConnectorError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    pub backoff_class: BackoffClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectorError {
    fn new(
        category: ErrorCategory,
        retryable: bool,
        backoff_class: BackoffClass,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retryable,
            retry_after_ms: None,
            backoff_class,
            details: None,
        }
    }

    /// Configuration error (not retryable, systemic).
    #[must_use]
    pub fn configuration(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, false, BackoffClass::Normal, code, message)
    }

    /// Authentication error (not retryable, systemic).
    #[must_use]
    pub fn auth(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, false, BackoffClass::Normal, code, message)
    }

    /// Rate limit error (retryable, slow backoff, honors provider hint).
    #[must_use]
    pub fn rate_limit(
        code: impl Into<String>,
        message: impl Into<String>,
        retry_after_ms: Option<u64>,
    ) -> Self {
        let mut err = Self::new(ErrorCategory::RateLimit, true, BackoffClass::Slow, code, message);
        err.retry_after_ms = retry_after_ms;
        err
    }

    /// Transient network error (retryable, normal backoff).
    #[must_use]
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientNetwork, true, BackoffClass::Normal, code, message)
    }

    /// Response-shape error (not retryable, endpoint scope).
    #[must_use]
    pub fn data_shape(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::DataShape, false, BackoffClass::Normal, code, message)
    }

    /// Cancellation marker (not retryable, not a failure).
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(
            ErrorCategory::Cancelled,
            false,
            BackoffClass::Normal,
            "CANCELLED",
            "job cancelled by operator",
        )
    }

    /// Internal engine error (not retryable).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, false, BackoffClass::Normal, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Systemic errors fail the whole job; everything else is scoped to
    /// one endpoint.
    #[must_use]
    pub fn is_systemic(&self) -> bool {
        matches!(self.category, ErrorCategory::Configuration | ErrorCategory::Auth)
    }
}
