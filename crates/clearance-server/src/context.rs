// crates/clearance-server/src/context.rs
// ============================================================================
// Module: Request Clearance Context
// Description: Per-request clearance evaluation middleware.
// Purpose: Attach a read-only subject and clearance level to every request.
// Dependencies: axum, clearance-core, http-body-util, tokio
// ============================================================================

//! ## Overview
//! The middleware reads the subject token from the configured header, then
//! the JSON or form body field, then the query field; the first non-empty
//! value wins. A present header always claims precedence, even when its
//! bytes are not visible ASCII. Resolution and clearance computation run on
//! the blocking pool. Any failure, including an unreadable body, degrades to
//! level 1 with no subject and the request proceeds; a `clearance_degraded`
//! audit event records the cause. Only a body over the buffering limit is
//! rejected (413).
//!
//! Handlers read the outcome as `Extension<Arc<ClearanceContext>>`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use axum::Form;
use axum::Json;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::FromRequest;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use clearance_core::ClassificationRegistry;
use clearance_core::ClassificationSource;
use clearance_core::ClearanceCalculator;
use clearance_core::ClearanceError;
use clearance_core::SecurityLevel;
use clearance_core::Subject;
use clearance_core::SubjectResolver;
use clearance_core::SubjectStore;
use http_body_util::LengthLimitError;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::ClearanceAuditEvent;
use crate::audit::ClearanceAuditSink;
use crate::audit::RequestSummary;
use crate::audit::token_fingerprint;
use crate::server::ServerError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type used when re-parsing buffered form bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Context
// ============================================================================

/// Channel a subject token was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// Request header.
    Header,
    /// JSON or form body field.
    Body,
    /// Query string field.
    Query,
}

/// Clearance attached to a request.
///
/// # Invariants
/// - `current_level` is always present; anonymous and degraded requests
///   carry level 1 and no subject.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClearanceContext {
    /// Resolved subject, if any.
    subject: Option<Subject>,
    /// Effective clearance level.
    current_level: SecurityLevel,
    /// Channel the token came from.
    token_source: Option<TokenSource>,
    /// True when evaluation failed and the floor level was applied.
    degraded: bool,
}

impl ClearanceContext {
    /// Creates a context for a completed evaluation.
    #[must_use]
    pub const fn new(subject: Option<Subject>, current_level: SecurityLevel) -> Self {
        Self { subject, current_level, token_source: None, degraded: false }
    }

    /// Creates the minimum-privilege context used after a failure.
    #[must_use]
    pub const fn degraded(token_source: Option<TokenSource>) -> Self {
        Self { subject: None, current_level: SecurityLevel::FLOOR, token_source, degraded: true }
    }

    /// Records the channel the token was read from.
    #[must_use]
    pub const fn with_token_source(mut self, token_source: Option<TokenSource>) -> Self {
        self.token_source = token_source;
        self
    }

    /// Returns the resolved subject.
    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Returns the effective clearance level.
    #[must_use]
    pub const fn current_level(&self) -> SecurityLevel {
        self.current_level
    }

    /// Returns the token channel.
    #[must_use]
    pub const fn token_source(&self) -> Option<TokenSource> {
        self.token_source
    }

    /// Returns true when the floor level was applied after a failure.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Resolver and calculator pair evaluated for each request.
#[derive(Clone)]
pub struct ClearanceService {
    /// Token to subject resolution.
    resolver: SubjectResolver,
    /// Subject to clearance computation.
    calculator: ClearanceCalculator,
}

impl ClearanceService {
    /// Creates a service over the given directory stores.
    #[must_use]
    pub fn new(subjects: Arc<dyn SubjectStore>, groups: Arc<dyn ClassificationSource>) -> Self {
        Self {
            resolver: SubjectResolver::new(subjects),
            calculator: ClearanceCalculator::new(ClassificationRegistry::new(groups)),
        }
    }

    /// Returns the classification registry.
    #[must_use]
    pub const fn registry(&self) -> &ClassificationRegistry {
        self.calculator.registry()
    }

    /// Resolves `token` and computes its clearance.
    ///
    /// # Errors
    ///
    /// Returns [`ClearanceError`] for malformed tokens and store failures.
    pub fn evaluate(&self, token: Option<&str>) -> Result<ClearanceContext, ClearanceError> {
        let subject = self.resolver.resolve(token)?;
        let level = self.calculator.compute_level(subject.as_ref())?;
        Ok(ClearanceContext::new(subject, level))
    }
}

// ============================================================================
// SECTION: Token Channels
// ============================================================================

/// Names of the channels carrying the subject token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChannels {
    /// Header consulted first.
    header: HeaderName,
    /// Body and query field name.
    field: String,
}

impl IdentityChannels {
    /// Creates channel names from configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the header name is not a valid
    /// HTTP header name.
    pub fn new(header: &str, field: impl Into<String>) -> Result<Self, ServerError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|err| ServerError::Config(format!("invalid identity header: {err}")))?;
        Ok(Self { header, field: field.into() })
    }

    /// Returns the header name.
    #[must_use]
    pub const fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Returns the body/query field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Body encodings that may carry a token field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// `application/json` or any `+json` suffix.
    Json,
    /// URL-encoded form.
    Form,
}

/// Returns the trimmed header token, if present and non-empty.
///
/// Non-ASCII bytes are decoded as UTF-8, lossily.
#[must_use]
pub fn header_token(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers.get(name).and_then(|value| non_empty(&String::from_utf8_lossy(value.as_bytes())))
}

/// Returns the trimmed query field token, if present and non-empty.
#[must_use]
pub fn query_token(uri: &Uri, field: &str) -> Option<String> {
    let Query(fields) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    fields.get(field).and_then(|value| non_empty(value))
}

/// Returns the token from a JSON body object.
///
/// Strings and integers are accepted; any other value is ignored.
#[must_use]
pub fn json_body_token(body: &[u8], field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get(field)? {
        Value::String(text) => non_empty(text),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}

/// Returns the token from a URL-encoded form body.
pub async fn form_body_token(body: Bytes, field: &str) -> Option<String> {
    let request = Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(Body::from(body))
        .ok()?;
    let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &()).await.ok()?;
    fields.get(field).and_then(|value| non_empty(value))
}

/// Classifies the request body by content type.
fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if essence == "application/json" || essence.ends_with("+json") {
        Some(BodyKind::Json)
    } else if essence == FORM_CONTENT_TYPE {
        Some(BodyKind::Form)
    } else {
        None
    }
}

/// Trims a candidate token, discarding blanks.
fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Shared state for [`clearance_middleware`].
pub struct ContextState {
    /// Clearance evaluation service.
    pub service: ClearanceService,
    /// Token channel names.
    pub channels: IdentityChannels,
    /// Maximum buffered body size in bytes.
    pub max_body_bytes: usize,
    /// Audit sink for clearance events.
    pub audit: Arc<dyn ClearanceAuditSink>,
    /// Emit `clearance_resolved` for successful evaluations.
    pub log_resolutions: bool,
}

/// Evaluates the caller's clearance and stores it in request extensions.
pub async fn clearance_middleware(
    State(state): State<Arc<ContextState>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut token = header_token(&parts.headers, state.channels.header())
        .map(|token| (token, TokenSource::Header));
    let mut body = body;
    let mut body_failure = None;
    if token.is_none()
        && let Some(kind) = body_kind(&parts.headers)
    {
        match axum::body::to_bytes(body, state.max_body_bytes).await {
            Ok(bytes) => {
                let found = match kind {
                    BodyKind::Json => json_body_token(&bytes, state.channels.field()),
                    BodyKind::Form => form_body_token(bytes.clone(), state.channels.field()).await,
                };
                token = found.map(|token| (token, TokenSource::Body));
                body = Body::from(bytes);
            }
            Err(err) if exceeds_body_limit(&err) => return body_too_large(),
            Err(err) => {
                body_failure = Some(format!("request body unreadable: {err}"));
                body = Body::empty();
            }
        }
    }
    if token.is_none() && body_failure.is_none() {
        token = query_token(&parts.uri, state.channels.field())
            .map(|token| (token, TokenSource::Query));
    }

    let token_source = token.as_ref().map(|(_, source)| *source);
    let summary = RequestSummary {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        token_source,
        token_fingerprint: token.as_ref().map(|(raw, _)| token_fingerprint(raw)),
    };
    let context = match body_failure {
        Some(reason) => {
            state.audit.record_clearance(&ClearanceAuditEvent::degraded(&summary, reason));
            ClearanceContext::degraded(token_source)
        }
        None => evaluate_token(&state, &summary, token.map(|(raw, _)| raw)).await,
    };
    parts.extensions.insert(Arc::new(context));
    next.run(Request::from_parts(parts, body)).await
}

/// Runs clearance evaluation on the blocking pool, degrading on failure.
async fn evaluate_token(
    state: &ContextState,
    summary: &RequestSummary,
    raw: Option<String>,
) -> ClearanceContext {
    let service = state.service.clone();
    let token_source = summary.token_source;
    let outcome = tokio::task::spawn_blocking(move || service.evaluate(raw.as_deref())).await;
    match outcome {
        Ok(Ok(context)) => {
            if state.log_resolutions {
                state.audit.record_clearance(&ClearanceAuditEvent::resolved(
                    summary,
                    context.subject(),
                    context.current_level(),
                ));
            }
            context.with_token_source(token_source)
        }
        Ok(Err(err)) => {
            state.audit.record_clearance(&ClearanceAuditEvent::degraded(summary, err.to_string()));
            ClearanceContext::degraded(token_source)
        }
        Err(err) => {
            let reason = format!("clearance worker failed: {err}");
            state.audit.record_clearance(&ClearanceAuditEvent::degraded(summary, reason));
            ClearanceContext::degraded(token_source)
        }
    }
}

/// Returns true when a body read failed on the buffering limit.
fn exceeds_body_limit(err: &axum::Error) -> bool {
    std::iter::successors(Some::<&(dyn StdError + 'static)>(err), |current: &&(dyn StdError + 'static)| (*current).source())
        .any(|current| current.is::<LengthLimitError>())
}

/// Rejects bodies above the buffering limit.
fn body_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({"success": false, "message": "Request body too large"})),
    )
        .into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use axum::http::HeaderValue;

    use super::*;

    fn channels() -> IdentityChannels {
        IdentityChannels::new("x-user-id", "userId").unwrap()
    }

    #[test]
    fn header_token_trims_and_skips_blanks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("  user.basic "));
        assert_eq!(header_token(&headers, channels().header()), Some("user.basic".to_string()));
        headers.insert("x-user-id", HeaderValue::from_static("   "));
        assert_eq!(header_token(&headers, channels().header()), None);
    }

    #[test]
    fn header_token_keeps_non_ascii_values() {
        let mut headers = HeaderMap::new();
        let name = "\u{5de}\u{5e9}\u{5d4}";
        headers.insert("x-user-id", HeaderValue::from_bytes(name.as_bytes()).unwrap());
        assert_eq!(header_token(&headers, channels().header()).as_deref(), Some(name));
        headers.insert("x-user-id", HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        let lossy = header_token(&headers, channels().header());
        assert_eq!(lossy.as_deref(), Some("\u{fffd}\u{fffd}"));
    }

    #[tokio::test]
    async fn only_limit_failures_count_as_oversized() {
        let err = axum::body::to_bytes(Body::from(vec![0_u8; 16]), 4).await.unwrap_err();
        assert!(exceeds_body_limit(&err));
        let reset = axum::Error::new(std::io::Error::other("connection reset"));
        assert!(!exceeds_body_limit(&reset));
    }

    #[test]
    fn query_token_decodes_percent_escapes() {
        let uri: Uri = "/api/apps?userId=manager%2Edepartment&x=1".parse().unwrap();
        assert_eq!(query_token(&uri, "userId"), Some("manager.department".to_string()));
        let uri: Uri = "/api/apps?other=1".parse().unwrap();
        assert_eq!(query_token(&uri, "userId"), None);
    }

    #[test]
    fn json_body_accepts_strings_and_integers_only() {
        assert_eq!(
            json_body_token(br#"{"userId":"admin.security"}"#, "userId").as_deref(),
            Some("admin.security")
        );
        assert_eq!(json_body_token(br#"{"userId":42}"#, "userId").as_deref(), Some("42"));
        assert_eq!(json_body_token(br#"{"userId":{"$ne":null}}"#, "userId"), None);
        assert_eq!(json_body_token(br#"[1,2]"#, "userId"), None);
        assert_eq!(json_body_token(b"not json", "userId"), None);
    }

    #[tokio::test]
    async fn form_body_token_reads_urlencoded_fields() {
        let body = Bytes::from_static(b"title=x&userId=executive.senior");
        assert_eq!(form_body_token(body, "userId").await.as_deref(), Some("executive.senior"));
    }

    #[test]
    fn body_kind_ignores_parameters_and_case() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=utf-8"));
        assert_eq!(body_kind(&headers), Some(BodyKind::Json));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert_eq!(body_kind(&headers), Some(BodyKind::Json));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        assert_eq!(body_kind(&headers), Some(BodyKind::Form));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(body_kind(&headers), None);
    }

    #[test]
    fn degraded_context_is_minimum_privilege() {
        let context = ClearanceContext::degraded(Some(TokenSource::Query));
        assert!(context.is_degraded());
        assert!(context.subject().is_none());
        assert_eq!(context.current_level(), SecurityLevel::FLOOR);
        assert_eq!(ClearanceContext::default().current_level(), SecurityLevel::FLOOR);
    }
}
