//! Connector trait definition.

use async_trait::async_trait;

use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;
use vaultsync_types::record::FetchOutput;

/// Capability interface implemented by every platform connector.
///
/// A connector owns one HTTP client and one resolved credential set,
/// both fixed at construction. Instances are `Send + Sync` so the
/// orchestrator can hold them behind `Box<dyn Connector>`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable connector name (e.g. `"HubSpot"`).
    fn name(&self) -> &str;

    /// Platform-type key this connector serves (e.g. `"hubspot"`).
    fn platform(&self) -> &str;

    /// The fixed catalog of extractable endpoints.
    fn endpoints(&self) -> &[EndpointDescriptor];

    /// Validate credentials with one cheap authenticated call.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectorError`] with category `auth` when the
    /// provider rejects the credentials, or `transient_network` when the
    /// probe could not complete.
    async fn test(&self) -> Result<(), ConnectorError>;

    /// Fetch one endpoint to completion, optionally filtered by a
    /// since-watermark.
    ///
    /// # Errors
    ///
    /// Any network error or non-2xx response fails the entire endpoint
    /// fetch; no partial page is kept. Callers decide whether to retry.
    async fn fetch(
        &self,
        endpoint: &EndpointDescriptor,
        since: Option<&str>,
    ) -> Result<FetchOutput, ConnectorError>;
}
