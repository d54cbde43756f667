// crates/clearance-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Helpers
// Description: Router builders, recording audit sink, and failing stores.
// ============================================================================

//! Shared helpers for clearance-server integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use clearance_core::ClassificationGroup;
use clearance_core::ClassificationSource;
use clearance_core::GroupId;
use clearance_core::InMemoryDirectory;
use clearance_core::SecurityLevel;
use clearance_core::StoreError;
use clearance_core::Subject;
use clearance_core::SubjectId;
use clearance_core::SubjectStore;
use clearance_server::AppState;
use clearance_server::ClearanceAuditEvent;
use clearance_server::ClearanceAuditSink;
use clearance_server::ClearanceService;
use clearance_server::ContextState;
use clearance_server::IdentityChannels;
use clearance_server::ResourceAccessEvent;
use clearance_server::ResourceCatalog;
use clearance_server::build_router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Clearance events in arrival order.
    pub clearance: Mutex<Vec<ClearanceAuditEvent>>,
    /// Access events in arrival order.
    pub access: Mutex<Vec<ResourceAccessEvent>>,
}

impl RecordingAuditSink {
    /// Returns the recorded clearance event names.
    pub fn clearance_events(&self) -> Vec<&'static str> {
        self.clearance.lock().unwrap().iter().map(|event| event.event).collect()
    }

    /// Returns the recorded access events.
    pub fn access_events(&self) -> Vec<ResourceAccessEvent> {
        self.access.lock().unwrap().clone()
    }
}

impl ClearanceAuditSink for RecordingAuditSink {
    fn record_clearance(&self, event: &ClearanceAuditEvent) {
        self.clearance.lock().unwrap().push(event.clone());
    }

    fn record_access(&self, event: &ResourceAccessEvent) {
        self.access.lock().unwrap().push(event.clone());
    }
}

/// Directory whose every lookup fails.
pub struct UnavailableDirectory;

impl ClassificationSource for UnavailableDirectory {
    fn find_active_group(&self, _: &GroupId) -> Result<Option<ClassificationGroup>, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }

    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }
}

impl SubjectStore for UnavailableDirectory {
    fn find_by_id(&self, _: &SubjectId) -> Result<Option<Subject>, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }

    fn find_by_username(&self, _: &str) -> Result<Option<Subject>, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }
}

/// Options for [`router_with`].
pub struct TestServer {
    /// Subject lookups.
    pub subjects: Arc<dyn SubjectStore>,
    /// Group lookups.
    pub groups: Arc<dyn ClassificationSource>,
    /// Buffered body limit.
    pub max_body_bytes: usize,
    /// Classification listing gate.
    pub registry_view_level: SecurityLevel,
    /// Whether resolutions are audited.
    pub log_resolutions: bool,
}

impl TestServer {
    /// Seeded in-memory directory with default limits.
    pub fn seeded() -> Self {
        let directory = Arc::new(InMemoryDirectory::seeded());
        Self::over(directory.clone(), directory)
    }

    /// Server over the given stores with default limits.
    pub fn over(subjects: Arc<dyn SubjectStore>, groups: Arc<dyn ClassificationSource>) -> Self {
        Self {
            subjects,
            groups,
            max_body_bytes: 64 * 1024,
            registry_view_level: SecurityLevel::CEILING,
            log_resolutions: true,
        }
    }

    /// Builds the router and returns it with its audit recorder.
    pub fn build(self) -> (Router, Arc<RecordingAuditSink>) {
        let audit = Arc::new(RecordingAuditSink::default());
        let context = ContextState {
            service: ClearanceService::new(self.subjects, self.groups),
            channels: IdentityChannels::new("x-user-id", "userId").unwrap(),
            max_body_bytes: self.max_body_bytes,
            audit: audit.clone(),
            log_resolutions: self.log_resolutions,
        };
        let state = AppState {
            context: Arc::new(context),
            catalog: Arc::new(ResourceCatalog::demo()),
            registry_view_level: self.registry_view_level,
        };
        (build_router(Arc::new(state)), audit)
    }
}

/// Sends `request` and decodes the JSON response body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

/// Builds a GET request with an optional subject header.
pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::empty()).unwrap()
}
