//! Shared paginated HTTP fetch engine.
//!
//! Every platform connector drives its requests through a [`FetchEngine`]:
//! one `reqwest::Client` and one resolved [`AuthConfig`], both fixed at
//! construction. The engine injects auth on every request, sleeps the
//! provider's rate-limit delay between successive pages, and materializes
//! each endpoint's full record list.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::debug;

use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;
use vaultsync_types::platform::AuthConfig;
use vaultsync_types::record::{FetchOutput, RawRecord};

use crate::auth::apply_auth;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on pages fetched per endpoint. A provider that never
/// shrinks its final page would otherwise loop forever.
pub const DEFAULT_PAGE_CAP: u32 = 10_000;

/// Envelope field tried when an endpoint declares no entity key.
const DEFAULT_ENTITY_KEY: &str = "data";

/// Paginated HTTP fetcher bound to one platform connection.
#[derive(Debug)]
pub struct FetchEngine {
    client: reqwest::Client,
    base_url: Url,
    auth: AuthConfig,
    rate_limit: Duration,
    page_cap: u32,
}

impl FetchEngine {
    /// Build an engine for `base_url` with the given credentials and
    /// inter-request delay.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::configuration` when the base URL is
    /// invalid or the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        auth: AuthConfig,
        rate_limit: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ConnectorError::configuration("BAD_BASE_URL", format!("invalid base URL '{base_url}': {e}"))
        })?;
        let client = reqwest::Client::builder()
            .user_agent("vaultsync/0.1")
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ConnectorError::configuration("HTTP_CLIENT", format!("HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url,
            auth,
            rate_limit,
            page_cap: DEFAULT_PAGE_CAP,
        })
    }

    /// Override the page-cap safety net.
    #[must_use]
    pub fn with_page_cap(mut self, page_cap: u32) -> Self {
        self.page_cap = page_cap;
        self
    }

    /// The configured inter-request delay.
    #[must_use]
    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    fn url_for(&self, path: &str, params: &[(String, String)]) -> Result<Url, ConnectorError> {
        let mut url = self.base_url.join(path).map_err(|e| {
            ConnectorError::configuration("BAD_PATH", format!("invalid endpoint path '{path}': {e}"))
        })?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (k, v)));
        }
        Ok(url)
    }

    /// One authenticated GET returning the parsed JSON body and its size.
    async fn get_json(
        &self,
        url: Url,
        endpoint: &str,
    ) -> Result<(serde_json::Value, u64), ConnectorError> {
        let request = apply_auth(self.client.get(url), &self.auth);
        let response = request
            .send()
            .await
            .map_err(|e| classify_request_error(&e, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &response, endpoint));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_request_error(&e, endpoint))?;
        let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            ConnectorError::data_shape(
                "INVALID_JSON",
                format!("endpoint '{endpoint}': response is not valid JSON: {e}"),
            )
        })?;
        Ok((value, body.len() as u64))
    }

    /// Lightweight authenticated GET used by connector `test()` probes.
    ///
    /// # Errors
    ///
    /// Propagates the classified request/status error.
    pub async fn probe(&self, path: &str) -> Result<(), ConnectorError> {
        let url = self.url_for(path, &[])?;
        self.get_json(url, path).await?;
        Ok(())
    }

    /// Fetch one endpoint to completion.
    ///
    /// Paginated endpoints loop: request a page, extract the entity
    /// array, and stop on the first short page. Non-paginated endpoints
    /// issue a single request. Any network error or non-2xx status fails
    /// the whole endpoint with no partial page kept.
    ///
    /// # Errors
    ///
    /// See [`ConnectorError`] categories; callers decide whether to retry.
    pub async fn fetch_endpoint(
        &self,
        endpoint: &EndpointDescriptor,
        since: Option<&str>,
    ) -> Result<FetchOutput, ConnectorError> {
        let opts = &endpoint.options;
        let entity_key = opts.entity_key.as_deref().unwrap_or(DEFAULT_ENTITY_KEY);
        let id_field = opts.id_field.as_deref();
        let paginated = endpoint.is_paginated();

        let mut base_params: Vec<(String, String)> = opts.extra_params.clone();
        if let (Some(param), Some(value)) = (opts.incremental_param.as_ref(), since) {
            base_params.push((param.clone(), value.to_string()));
        }

        let mut output = FetchOutput::default();
        let mut offset: u64 = 0;

        loop {
            if output.pages_fetched >= self.page_cap {
                return Err(ConnectorError::data_shape(
                    "PAGE_CAP_EXCEEDED",
                    format!(
                        "endpoint '{}': provider returned {} full pages without a short page",
                        endpoint.name, self.page_cap
                    ),
                ));
            }

            let mut params = base_params.clone();
            if paginated {
                // is_paginated() guarantees both parameter names.
                if let (Some(limit), Some(off)) = (&opts.limit_param, &opts.offset_param) {
                    params.push((limit.clone(), opts.page_limit.to_string()));
                    params.push((off.clone(), offset.to_string()));
                }
            }

            let url = self.url_for(&endpoint.path, &params)?;
            let (value, body_len) = self.get_json(url, &endpoint.name).await?;
            output.pages_fetched += 1;
            output.bytes_fetched += body_len;

            let entities = extract_entities(&value, entity_key, &endpoint.name, paginated)?;
            let page_len = entities.len();
            for mut entity in entities {
                if let Some(field) = opts.incremental_field.as_deref() {
                    if let Some(candidate) = field_as_string(&entity, field) {
                        advance_watermark(&mut output.watermark, candidate);
                    }
                }
                apply_renames(&mut entity, &opts.field_renames);
                output.records.push(RawRecord::from_value(entity, id_field));
            }

            debug!(
                endpoint = endpoint.name,
                page = output.pages_fetched,
                page_len,
                total = output.records.len(),
                "fetched page"
            );

            if !paginated || page_len < opts.page_limit as usize {
                break;
            }
            offset += u64::from(opts.page_limit);
            tokio::time::sleep(self.rate_limit).await;
        }

        Ok(output)
    }
}

/// Locate the record array inside a response envelope.
///
/// A dotted `entity_key` is walked through nested objects. A bare
/// top-level array is accepted as-is. For non-paginated endpoints a
/// single object at the key (or at the top level when the default key is
/// absent) is wrapped as one record.
fn extract_entities(
    value: &serde_json::Value,
    entity_key: &str,
    endpoint: &str,
    paginated: bool,
) -> Result<Vec<serde_json::Value>, ConnectorError> {
    if let serde_json::Value::Array(items) = value {
        return Ok(items.clone());
    }

    let mut node = value;
    let mut found = true;
    for part in entity_key.split('.') {
        match node.get(part) {
            Some(next) => node = next,
            None => {
                found = false;
                break;
            }
        }
    }

    if found {
        match node {
            serde_json::Value::Array(items) => return Ok(items.clone()),
            serde_json::Value::Object(_) if !paginated => return Ok(vec![node.clone()]),
            _ => {
                return Err(ConnectorError::data_shape(
                    "ENTITY_KEY_NOT_ARRAY",
                    format!("endpoint '{endpoint}': field '{entity_key}' is not an array"),
                ));
            }
        }
    }

    // A settings-style endpoint may return a bare object with no envelope.
    if !paginated && value.is_object() {
        return Ok(vec![value.clone()]);
    }

    Err(ConnectorError::data_shape(
        "MISSING_ENTITY_KEY",
        format!("endpoint '{endpoint}': response has no '{entity_key}' array"),
    ))
}

/// Apply catalog-declared field renames to one record payload.
fn apply_renames(entity: &mut serde_json::Value, renames: &[(String, String)]) {
    if renames.is_empty() {
        return;
    }
    if let serde_json::Value::Object(map) = entity {
        for (from, to) in renames {
            if let Some(value) = map.remove(from) {
                map.insert(to.clone(), value);
            }
        }
    }
}

fn field_as_string(entity: &serde_json::Value, field: &str) -> Option<String> {
    match entity.get(field) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep the larger of the current watermark and a candidate value.
///
/// Values that both parse as integers compare numerically (epoch-seconds
/// cursors); everything else compares lexicographically, which is correct
/// for ISO-8601 timestamps.
fn advance_watermark(current: &mut Option<String>, candidate: String) {
    let newer = match current.as_deref() {
        None => true,
        Some(existing) => match (existing.parse::<i64>(), candidate.parse::<i64>()) {
            (Ok(a), Ok(b)) => b > a,
            _ => candidate.as_str() > existing,
        },
    };
    if newer {
        *current = Some(candidate);
    }
}

/// Map a transport-level failure onto the error model.
fn classify_request_error(error: &reqwest::Error, endpoint: &str) -> ConnectorError {
    if error.is_timeout() {
        ConnectorError::transient_network(
            "TIMEOUT",
            format!("endpoint '{endpoint}': request timed out"),
        )
    } else if error.is_connect() {
        ConnectorError::transient_network(
            "CONNECT",
            format!("endpoint '{endpoint}': connection failed: {error}"),
        )
    } else {
        ConnectorError::transient_network(
            "REQUEST",
            format!("endpoint '{endpoint}': request failed: {error}"),
        )
    }
}

/// Map a non-2xx status onto the error model.
fn classify_status(
    status: StatusCode,
    response: &reqwest::Response,
    endpoint: &str,
) -> ConnectorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::auth(
            "UNAUTHORIZED",
            format!("endpoint '{endpoint}': provider returned {status}"),
        ),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            ConnectorError::rate_limit(
                "RATE_LIMITED",
                format!("endpoint '{endpoint}': provider returned 429"),
                retry_after_ms,
            )
        }
        StatusCode::NOT_FOUND => ConnectorError::data_shape(
            "NOT_FOUND",
            format!("endpoint '{endpoint}': provider returned 404"),
        ),
        s if s.is_server_error() => ConnectorError::transient_network(
            "SERVER_ERROR",
            format!("endpoint '{endpoint}': provider returned {s}"),
        ),
        s => ConnectorError::data_shape(
            "UNEXPECTED_STATUS",
            format!("endpoint '{endpoint}': provider returned {s}"),
        ),
    }
}
