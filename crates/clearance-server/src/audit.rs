// crates/clearance-server/src/audit.rs
// ============================================================================
// Module: Clearance Audit
// Description: Structured audit events and sinks for clearance decisions.
// Purpose: Record resolution, degradation, and resource access outcomes.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Sinks never fail
//! the request path: write errors are dropped after the event is formatted.
//! Raw subject tokens are never logged; events carry a truncated SHA-256
//! fingerprint instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clearance_core::AccessCheck;
use clearance_core::SecurityLevel;
use clearance_core::Subject;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::context::TokenSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of hex characters kept from a token fingerprint.
const FINGERPRINT_HEX_LEN: usize = 16;
/// Lowercase hex alphabet.
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

// ============================================================================
// SECTION: Events
// ============================================================================

/// Severity attached to an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    /// Normal operation.
    Info,
    /// Degraded operation that still served the request.
    Warn,
}

/// Clearance evaluation event emitted by the request middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearanceAuditEvent {
    /// Event name (`clearance_resolved` or `clearance_degraded`).
    pub event: &'static str,
    /// Event severity.
    pub severity: AuditSeverity,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// HTTP method of the request.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Channel the token was read from.
    pub token_source: Option<TokenSource>,
    /// Truncated SHA-256 fingerprint of the raw token.
    pub token_fingerprint: Option<String>,
    /// Resolved subject identifier.
    pub subject_id: Option<String>,
    /// Effective clearance attached to the request.
    pub current_level: u8,
    /// Failure description for degraded evaluations.
    pub reason: Option<String>,
}

impl ClearanceAuditEvent {
    /// Builds a `clearance_resolved` event.
    #[must_use]
    pub fn resolved(
        request: &RequestSummary,
        subject: Option<&Subject>,
        current_level: SecurityLevel,
    ) -> Self {
        Self {
            event: "clearance_resolved",
            severity: AuditSeverity::Info,
            timestamp_ms: unix_millis(),
            method: request.method.clone(),
            path: request.path.clone(),
            token_source: request.token_source,
            token_fingerprint: request.token_fingerprint.clone(),
            subject_id: subject.map(|subject| subject.subject_id.to_string()),
            current_level: current_level.get(),
            reason: None,
        }
    }

    /// Builds a `clearance_degraded` event for a fail-open evaluation.
    #[must_use]
    pub fn degraded(request: &RequestSummary, reason: impl Into<String>) -> Self {
        Self {
            event: "clearance_degraded",
            severity: AuditSeverity::Warn,
            timestamp_ms: unix_millis(),
            method: request.method.clone(),
            path: request.path.clone(),
            token_source: request.token_source,
            token_fingerprint: request.token_fingerprint.clone(),
            subject_id: None,
            current_level: SecurityLevel::FLOOR.get(),
            reason: Some(reason.into()),
        }
    }
}

/// Request metadata shared by clearance events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Channel the token was read from.
    pub token_source: Option<TokenSource>,
    /// Token fingerprint, never the token itself.
    pub token_fingerprint: Option<String>,
}

/// Outcome of a single-resource access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Resource returned.
    Allow,
    /// Resource exists but clearance is insufficient.
    Deny,
    /// Resource does not exist.
    NotFound,
}

/// Single-resource access event emitted by fetch-by-id handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAccessEvent {
    /// Event name (`resource_access`).
    pub event: &'static str,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Resource kind (`app` or `file`).
    pub resource_kind: &'static str,
    /// Requested resource identifier.
    pub resource_id: String,
    /// Requesting subject, when resolved.
    pub subject_id: Option<String>,
    /// Access decision.
    pub decision: AccessDecision,
    /// Required level, absent for missing resources.
    pub required: Option<i64>,
    /// Effective clearance of the request.
    pub current: u8,
}

impl ResourceAccessEvent {
    /// Builds an access event from a completed check.
    #[must_use]
    pub fn checked(
        resource_kind: &'static str,
        resource_id: &str,
        subject: Option<&Subject>,
        check: AccessCheck,
    ) -> Self {
        Self {
            event: "resource_access",
            timestamp_ms: unix_millis(),
            resource_kind,
            resource_id: resource_id.to_string(),
            subject_id: subject.map(|subject| subject.subject_id.to_string()),
            decision: if check.allowed { AccessDecision::Allow } else { AccessDecision::Deny },
            required: Some(check.required),
            current: check.current.get(),
        }
    }

    /// Builds an access event for a missing resource.
    #[must_use]
    pub fn not_found(
        resource_kind: &'static str,
        resource_id: &str,
        subject: Option<&Subject>,
        current: SecurityLevel,
    ) -> Self {
        Self {
            event: "resource_access",
            timestamp_ms: unix_millis(),
            resource_kind,
            resource_id: resource_id.to_string(),
            subject_id: subject.map(|subject| subject.subject_id.to_string()),
            decision: AccessDecision::NotFound,
            required: None,
            current: current.get(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for clearance events.
pub trait ClearanceAuditSink: Send + Sync {
    /// Records a clearance evaluation event.
    fn record_clearance(&self, event: &ClearanceAuditEvent);
    /// Records a single-resource access event.
    fn record_access(&self, event: &ResourceAccessEvent);
}

/// Audit sink writing JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event line.
    fn write_line<T: Serialize>(event: &T) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}

impl ClearanceAuditSink for StderrAuditSink {
    fn record_clearance(&self, event: &ClearanceAuditEvent) {
        Self::write_line(event);
    }

    fn record_access(&self, event: &ResourceAccessEvent) {
        Self::write_line(event);
    }
}

/// Audit sink appending JSON lines to a file.
pub struct FileAuditSink {
    /// Open append-mode file handle.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens (or creates) an append-only audit log.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Appends one serialized event line.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(line) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

impl ClearanceAuditSink for FileAuditSink {
    fn record_clearance(&self, event: &ClearanceAuditEvent) {
        self.write_line(event);
    }

    fn record_access(&self, event: &ResourceAccessEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopAuditSink;

impl ClearanceAuditSink for NoopAuditSink {
    fn record_clearance(&self, _event: &ClearanceAuditEvent) {}

    fn record_access(&self, _event: &ResourceAccessEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a short, non-reversible fingerprint for a raw token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hex = String::with_capacity(FINGERPRINT_HEX_LEN);
    for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
        hex.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
        hex.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
    }
    hex
}

/// Returns the current Unix time in milliseconds, saturating on overflow.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
