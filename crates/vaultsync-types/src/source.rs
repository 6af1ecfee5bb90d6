//! Configured backup sources and platform connections.

use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, SourceId};
use crate::platform::PlatformType;

/// How often a source is scheduled to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupFrequency {
    Hourly,
    Daily,
    Weekly,
}

impl Default for BackupFrequency {
    fn default() -> Self {
        Self::Daily
    }
}

/// One user's authenticated link to a platform. The secret material
/// itself lives behind the credential resolver, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConnection {
    pub id: ConnectionId,
    pub platform: PlatformType,
}

/// A configured backup job: one connection, one platform template,
/// plus user-overridable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub platform: PlatformType,
    pub connection_id: ConnectionId,
    /// Endpoint names to back up. Empty means the platform catalog's
    /// enabled-by-default set.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Use persisted watermarks for delta fetches where supported.
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub frequency: BackupFrequency,
    /// Retention horizon for backed-up records. Enforcement is a
    /// downstream consumer concern.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Free-form per-source parameters forwarded to the connector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_params: Vec<(String, String)>,
}

fn default_retention_days() -> u32 {
    30
}

impl Source {
    /// Create a source with default settings.
    #[must_use]
    pub fn new(
        id: impl Into<SourceId>,
        name: impl Into<String>,
        platform: impl Into<PlatformType>,
        connection_id: impl Into<ConnectionId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            platform: platform.into(),
            connection_id: connection_id.into(),
            endpoints: Vec::new(),
            incremental: false,
            frequency: BackupFrequency::default(),
            retention_days: default_retention_days(),
            custom_params: Vec::new(),
        }
    }
}
