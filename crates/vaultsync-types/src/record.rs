//! Fetched record envelope and fetch summaries.

use serde::{Deserialize, Serialize};

/// One entity fetched from a provider, as raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Provider-side identifier, when the endpoint declares an id field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub payload: serde_json::Value,
}

impl RawRecord {
    /// Wrap a JSON entity, extracting its identifier via `id_field`.
    ///
    /// Numeric and string identifiers are both accepted; anything else
    /// leaves the id unset.
    #[must_use]
    pub fn from_value(payload: serde_json::Value, id_field: Option<&str>) -> Self {
        let id = id_field.and_then(|field| match payload.get(field) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        Self { id, payload }
    }
}

/// Result of fetching one endpoint to completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchOutput {
    pub records: Vec<RawRecord>,
    pub pages_fetched: u32,
    pub bytes_fetched: u64,
    /// Maximum observed value of the endpoint's incremental field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
}
