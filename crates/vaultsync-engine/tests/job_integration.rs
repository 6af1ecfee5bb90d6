//! End-to-end orchestrator tests against a mock HTTP provider.
//!
//! A small CRM-shaped connector is registered under `mockcrm` and pointed
//! at a local wiremock server, exercising the full path: registry →
//! connector test → dependency-ordered fetch → record sink → watermarks →
//! terminal status classification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultsync_connectors::auth::{require_field, CredentialMap};
use vaultsync_connectors::registry::ConnectorCtor;
use vaultsync_connectors::{Connector, ConnectorRegistry, EndpointCatalog, FetchEngine};
use vaultsync_engine::{CancellationToken, Orchestrator, StaticCredentials};
use vaultsync_state::{SqliteStateBackend, StateBackend};
use vaultsync_types::endpoint::EndpointDescriptor;
use vaultsync_types::error::ConnectorError;
use vaultsync_types::ids::{EndpointName, SourceId};
use vaultsync_types::job::{JobConfig, JobStatus, StepStatus};
use vaultsync_types::platform::{AuthConfig, AuthStyle};
use vaultsync_types::record::FetchOutput;
use vaultsync_types::source::Source;

const PLATFORM: &str = "mockcrm";

struct MockCrm {
    engine: FetchEngine,
    catalog: EndpointCatalog,
}

#[async_trait]
impl Connector for MockCrm {
    fn name(&self) -> &str {
        "Mock CRM"
    }

    fn platform(&self) -> &str {
        PLATFORM
    }

    fn endpoints(&self) -> &[EndpointDescriptor] {
        self.catalog.as_slice()
    }

    async fn test(&self) -> Result<(), ConnectorError> {
        self.engine.probe("/ping").await
    }

    async fn fetch(
        &self,
        endpoint: &EndpointDescriptor,
        since: Option<&str>,
    ) -> Result<FetchOutput, ConnectorError> {
        self.engine.fetch_endpoint(endpoint, since).await
    }
}

fn ctor(base_url: String, catalog: EndpointCatalog) -> ConnectorCtor {
    Box::new(move |creds: &CredentialMap, settings| {
        let (_, key) = require_field(creds, &["api_key"], PLATFORM)?;
        let engine = FetchEngine::new(
            &base_url,
            AuthConfig::ApiKey {
                key: key.to_string(),
                style: AuthStyle::Bearer,
            },
            Duration::ZERO,
            settings.request_timeout,
        )?;
        let connector: Box<dyn Connector> = Box::new(MockCrm {
            engine,
            catalog: catalog.clone(),
        });
        Ok(connector)
    })
}

fn list_endpoint(name: &str, deps: &[&str]) -> EndpointDescriptor {
    EndpointDescriptor::new(name, format!("/v1/{name}"), format!("{name} records"))
        .paginated("limit", "offset")
        .entity_key("data")
        .id_field("id")
        .depends_on(deps)
}

struct Harness {
    orchestrator: Orchestrator,
    state: Arc<SqliteStateBackend>,
}

fn harness(server: &MockServer, endpoints: Vec<EndpointDescriptor>) -> Harness {
    let catalog = EndpointCatalog::new(endpoints).unwrap();
    let mut registry = ConnectorRegistry::new();
    registry
        .register(PLATFORM, catalog.clone(), ctor(server.uri(), catalog))
        .unwrap();

    let state = Arc::new(SqliteStateBackend::in_memory().unwrap());
    let credentials: CredentialMap =
        [("api_key".to_string(), json!("test-key"))].into_iter().collect();

    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        state.clone(),
        state.clone(),
        Arc::new(StaticCredentials::new(credentials)),
    );
    Harness {
        orchestrator,
        state,
    }
}

fn source() -> Source {
    Source::new("src-1", "Mock backup", PLATFORM, "conn-1")
}

async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(server)
        .await;
}

fn records(prefix: &str, range: std::ops::Range<u32>) -> serde_json::Value {
    let items: Vec<_> = range.map(|i| json!({"id": format!("{prefix}_{i}")})).collect();
    json!({"data": items})
}

#[tokio::test]
async fn end_to_end_contacts_then_orders() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    // contacts: 250 records over 3 pages at limit 100
    for (offset, range) in [(0u32, 0..100), (100, 100..200), (200, 200..250)] {
        Mock::given(method("GET"))
            .and(path("/v1/contacts"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(records("c", range)))
            .expect(1)
            .mount(&server)
            .await;
    }
    // orders: 50 records over 1 page
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("o", 0..50)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(
        &server,
        vec![
            list_endpoint("contacts", &[]),
            list_endpoint("orders", &["contacts"]),
        ],
    );

    let result = h
        .orchestrator
        .run_job(&source(), &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.progress.records_processed, 300);
    assert!((result.progress.percent_complete - 100.0).abs() < 0.01);

    let names: Vec<_> = result.endpoints.iter().map(|r| r.endpoint.as_str()).collect();
    assert_eq!(names, vec!["contacts", "orders"]);
    assert!(result
        .endpoints
        .iter()
        .all(|r| r.status == StepStatus::Succeeded));
    assert_eq!(result.endpoints[0].records, 250);
    assert_eq!(result.endpoints[1].records, 50);

    // Progress is pollable through the state backend.
    let progress = h
        .orchestrator
        .get_job_progress(result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.completed_steps, 2);
    assert_eq!(progress.records_processed, 300);
}

#[tokio::test]
async fn partial_failure_skips_dependents_but_not_siblings() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("a", 0..5)))
        .mount(&server)
        .await;
    // b fails hard: 404 is a data-shape failure, never retried
    Mock::given(method("GET"))
        .and(path("/v1/b"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    // c depends on b and must never be requested
    Mock::given(method("GET"))
        .and(path("/v1/c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("c", 0..5)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("d", 0..3)))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(
        &server,
        vec![
            list_endpoint("a", &[]),
            list_endpoint("b", &["a"]),
            list_endpoint("c", &["b"]),
            list_endpoint("d", &[]),
        ],
    );

    let result = h
        .orchestrator
        .run_job(&source(), &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::PartiallyCompleted);
    let by_name = |n: &str| result.endpoints.iter().find(|r| r.endpoint == n).unwrap();
    assert_eq!(by_name("a").status, StepStatus::Succeeded);
    assert_eq!(by_name("b").status, StepStatus::Failed);
    assert_eq!(by_name("c").status, StepStatus::Skipped);
    assert!(by_name("c").error.as_deref().unwrap().contains('b'));
    assert_eq!(by_name("d").status, StepStatus::Succeeded);

    assert_eq!(result.progress.completed_steps, 2);
    assert_eq!(result.progress.failed_steps, 1);
    assert_eq!(result.progress.skipped_steps, 1);
    assert_eq!(result.progress.records_processed, 8);
}

#[tokio::test]
async fn retry_exhaustion_marks_endpoint_failed() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    // 503 forever: initial attempt plus exactly max_retries retries.
    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(&server, vec![list_endpoint("contacts", &[])]);
    let config = JobConfig {
        max_retries: 2,
        ..JobConfig::default()
    };

    let result = h
        .orchestrator
        .run_job(&source(), &config, &CancellationToken::new())
        .await
        .unwrap();

    // No endpoint succeeded, so nothing useful was backed up.
    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.endpoints[0].status, StepStatus::Failed);
    assert_eq!(result.endpoints[0].attempts, 3);
}

#[tokio::test]
async fn auth_failure_mid_run_is_systemic_and_never_retried() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // The sibling endpoint would succeed, but a systemic failure stops
    // the job before it runs.
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("o", 0..5)))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(
        &server,
        vec![list_endpoint("contacts", &[]), list_endpoint("orders", &[])],
    );

    let result = h
        .orchestrator
        .run_job(&source(), &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.endpoints.len(), 1);
    assert_eq!(result.endpoints[0].attempts, 1);
}

#[tokio::test]
async fn rejected_credentials_fail_the_job_before_any_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("c", 0..5)))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, vec![list_endpoint("contacts", &[])]);
    let result = h
        .orchestrator
        .run_job(&source(), &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.endpoints.is_empty());
    assert!(result.progress.error_message.is_some());
}

#[tokio::test]
async fn cancellation_between_endpoints_preserves_fetched_data() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    // contacts responds slowly enough for the cancel to land first.
    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(records("c", 0..2))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records("o", 0..5)))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(
        &server,
        vec![
            list_endpoint("contacts", &[]),
            list_endpoint("orders", &["contacts"]),
        ],
    );

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = h
        .orchestrator
        .run_job(&source(), &JobConfig::default(), &cancel)
        .await
        .unwrap();

    // The in-flight endpoint finished (no mid-page abort) and its data
    // was persisted; the next endpoint never started.
    assert_eq!(result.status, JobStatus::Cancelled);
    assert_eq!(result.endpoints.len(), 1);
    assert_eq!(result.endpoints[0].endpoint, "contacts");
    assert_eq!(result.endpoints[0].status, StepStatus::Succeeded);
    assert_eq!(result.progress.records_processed, 2);
}

#[tokio::test]
async fn incremental_run_passes_and_advances_watermark() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"id": "c_1", "updatedAt": "2026-01-01T00:00:00Z"},
            {"id": "c_2", "updatedAt": "2026-01-02T00:00:00Z"},
        ]})))
        .mount(&server)
        .await;

    let contacts = list_endpoint("contacts", &[]).incremental("updatedAfter", "updatedAt");
    let h = harness(&server, vec![contacts]);

    let mut src = source();
    src.incremental = true;

    let first = h
        .orchestrator
        .run_job(&src, &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(first.progress.records_processed, 2);

    let watermark = h
        .state
        .load_watermark(&SourceId::new("src-1"), &EndpointName::new("contacts"))
        .unwrap()
        .unwrap();
    assert_eq!(watermark.value.as_deref(), Some("2026-01-02T00:00:00Z"));
    assert_eq!(watermark.field.as_deref(), Some("updatedAt"));

    // Second run must carry the watermark as a since-filter.
    server.reset().await;
    mount_ping(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .and(query_param("updatedAfter", "2026-01-02T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let second = h
        .orchestrator
        .run_job(&src, &JobConfig::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.progress.records_processed, 0);
}
