//! Watermark state for incremental fetches.

use serde::{Deserialize, Serialize};

/// Snapshot of a persisted watermark for a (source, endpoint) pair.
///
/// `updated_at` is an ISO-8601 UTC string (e.g. `"2026-01-15T10:00:00Z"`).
/// Backends handle timestamp formatting internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkState {
    /// Record field tracked for incremental sync (e.g. `"updatedAt"`).
    pub field: Option<String>,
    /// Last-seen value of that field.
    pub value: Option<String>,
    /// ISO-8601 UTC timestamp of when this watermark was last written.
    pub updated_at: String,
}
