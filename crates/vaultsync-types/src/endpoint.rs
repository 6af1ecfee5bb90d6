//! Endpoint catalog entries.
//!
//! An [`EndpointDescriptor`] describes one extractable resource of a
//! platform: where it lives, how its list responses are shaped, how it
//! paginates, and which other endpoints must complete before it runs.
//! Catalog data is immutable once a platform is registered.

use serde::{Deserialize, Serialize};

use crate::source::BackupFrequency;

/// Default page size requested from providers.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Default endpoint priority. Lower values are offered first in
/// catalog-default selections.
pub const DEFAULT_PRIORITY: u32 = 100;

/// Pagination and response-mapping options for one endpoint.
///
/// `limit_param`/`offset_param` absent means the endpoint is not
/// paginated (e.g. a settings lookup). `entity_key` absent falls back to
/// the conventional `data` envelope field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Dotted path to the record array inside the response envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,
    /// Query parameter carrying the page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
    /// Query parameter carrying the page offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_param: Option<String>,
    /// Requested page size.
    pub page_limit: u32,
    /// Static query parameters merged into every request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_params: Vec<(String, String)>,
    /// Query parameter carrying the incremental since-filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_param: Option<String>,
    /// Record field whose maximum value becomes the next watermark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_field: Option<String>,
    /// Record field holding the provider's entity identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    /// Record field renames applied during extraction (`from` → `to`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_renames: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            entity_key: None,
            limit_param: None,
            offset_param: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            extra_params: Vec::new(),
            incremental_param: None,
            incremental_field: None,
            id_field: None,
            field_renames: Vec::new(),
        }
    }
}

/// One extractable resource of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Catalog-unique endpoint name (e.g. `"contacts"`).
    pub name: String,
    /// Request path joined to the connector base URL.
    pub path: String,
    /// Human-readable description shown in catalog listings.
    pub description: String,
    /// Logical data type of the extracted entities.
    pub data_type: String,
    /// Whether this endpoint is backed up when the user makes no selection.
    pub enabled_by_default: bool,
    /// Ordering hint for catalog listings and default selections; lower
    /// runs earlier among endpoints with no dependency relation.
    pub priority: u32,
    /// Suggested backup cadence for this resource, overridable per source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_frequency: Option<BackupFrequency>,
    /// Whether the endpoint supports watermark-based delta fetches.
    pub supports_incremental: bool,
    /// Names of endpoints that must reach a terminal state first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Pagination and response-mapping options.
    pub options: FetchOptions,
}

impl EndpointDescriptor {
    /// Create a descriptor with default options, enabled by default.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            data_type: name.clone(),
            name,
            path: path.into(),
            description: description.into(),
            enabled_by_default: true,
            priority: DEFAULT_PRIORITY,
            default_frequency: None,
            supports_incremental: false,
            dependencies: Vec::new(),
            options: FetchOptions::default(),
        }
    }

    /// Enable limit/offset pagination with the default page size.
    #[must_use]
    pub fn paginated(mut self, limit_param: impl Into<String>, offset_param: impl Into<String>) -> Self {
        self.options.limit_param = Some(limit_param.into());
        self.options.offset_param = Some(offset_param.into());
        self
    }

    /// Set the envelope field holding the record array.
    #[must_use]
    pub fn entity_key(mut self, key: impl Into<String>) -> Self {
        self.options.entity_key = Some(key.into());
        self
    }

    /// Declare prerequisite endpoints.
    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(ToString::to_string).collect();
        self
    }

    /// Enable incremental fetches via the given since-parameter and
    /// watermark field.
    #[must_use]
    pub fn incremental(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.supports_incremental = true;
        self.options.incremental_param = Some(param.into());
        self.options.incremental_field = Some(field.into());
        self
    }

    /// Set the record identifier field.
    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.options.id_field = Some(field.into());
        self
    }

    /// Merge a static query parameter into every request.
    #[must_use]
    pub fn extra_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.extra_params.push((name.into(), value.into()));
        self
    }

    /// Override the requested page size.
    #[must_use]
    pub fn page_limit(mut self, limit: u32) -> Self {
        self.options.page_limit = limit;
        self
    }

    /// Rename a record field during extraction.
    #[must_use]
    pub fn rename_field(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.options.field_renames.push((from.into(), to.into()));
        self
    }

    /// Override the ordering-hint priority.
    #[must_use]
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether both pagination parameters are configured.
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.options.limit_param.is_some() && self.options.offset_param.is_some()
    }
}
