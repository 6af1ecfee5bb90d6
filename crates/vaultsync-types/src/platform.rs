//! Platform and authentication shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-type key used for registry lookups (e.g. `"hubspot"`).
///
/// Kept as an opaque string so new platforms register without touching
/// this crate; the connector registry rejects unknown values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformType(String);

impl PlatformType {
    /// Create a new platform-type key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PlatformType {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Credential shape a platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    ApiKey,
    Basic,
    OAuth,
}

/// How an api-key credential is sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// A provider-specific header (e.g. `X-Shopify-Access-Token`).
    CustomHeader { header: String },
}

/// Resolved credential set for one connector instance.
///
/// Fixed at construction and never mutated while a fetch is in flight.
/// The `Debug` impl redacts secret material so instances are safe to log.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    ApiKey { key: String, style: AuthStyle },
    Basic { username: String, password: String },
    OAuth { access_token: String },
}

impl AuthConfig {
    /// The credential shape this config resolves to.
    #[must_use]
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::ApiKey { .. } => AuthType::ApiKey,
            Self::Basic { .. } => AuthType::Basic,
            Self::OAuth { .. } => AuthType::OAuth,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { style, .. } => f
                .debug_struct("AuthConfig::ApiKey")
                .field("key", &"<redacted>")
                .field("style", style)
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("AuthConfig::Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::OAuth { .. } => f
                .debug_struct("AuthConfig::OAuth")
                .field("access_token", &"<redacted>")
                .finish(),
        }
    }
}
