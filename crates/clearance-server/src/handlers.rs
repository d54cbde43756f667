// crates/clearance-server/src/handlers.rs
// ============================================================================
// Module: Portal Handlers
// Description: HTTP handlers for apps, files, classifications, and diagnostics.
// Purpose: Apply clearance filtering and single-resource checks to responses.
// Dependencies: axum, clearance-core, serde_json
// ============================================================================

//! ## Overview
//! List endpoints filter by the request's clearance and report how many
//! items exist in total. Fetch-by-id endpoints distinguish a missing resource
//! (404) from an insufficient clearance (403 with `required` and `current`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;
use clearance_core::ProtectedResource;
use clearance_core::SecurityLevel;
use clearance_core::check_single;
use clearance_core::filter_by_level;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::ResourceAccessEvent;
use crate::catalog::FileQuery;
use crate::context::ClearanceContext;
use crate::server::AppState;

// ============================================================================
// SECTION: Rejections
// ============================================================================

/// Error responses produced by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRejection {
    /// Resource does not exist.
    NotFound(&'static str),
    /// Clearance below the resource requirement.
    Forbidden {
        /// Response message.
        message: &'static str,
        /// Required level.
        required: i64,
        /// Request clearance.
        current: SecurityLevel,
    },
    /// Malformed request input.
    BadRequest(&'static str),
    /// Backend failure.
    Internal(&'static str),
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": message})))
                    .into_response()
            }
            Self::Forbidden { message, required, current } => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "message": message,
                    "required": required,
                    "current": current,
                })),
            )
                .into_response(),
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({"success": false, "message": message})))
                    .into_response()
            }
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "message": message})),
            )
                .into_response(),
        }
    }
}

/// Rejects requests whose clearance is below `required`.
///
/// # Errors
///
/// Returns [`ApiRejection::Forbidden`] when the context level is too low.
pub fn require_level(
    context: &ClearanceContext,
    required: SecurityLevel,
) -> Result<(), ApiRejection> {
    if context.current_level() >= required {
        return Ok(());
    }
    Err(ApiRejection::Forbidden {
        message: "Insufficient security clearance",
        required: i64::from(required),
        current: context.current_level(),
    })
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// `GET /api/health`.
pub async fn health() -> Json<Value> {
    Json(json!({"success": true, "status": "healthy"}))
}

/// Fallback for unmatched routes: 404 echoing the requested path.
pub async fn route_not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    let path = uri.path_and_query().map_or_else(|| uri.path(), |target| target.as_str());
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": "Route not found", "path": path})),
    )
}

/// `GET /api/debug/me`: the caller's resolved clearance context.
pub async fn debug_me(Extension(context): Extension<Arc<ClearanceContext>>) -> Json<Value> {
    let user = context.subject().map(|subject| {
        json!({
            "id": subject.subject_id,
            "username": subject.username,
            "displayName": subject.display_name,
            "email": subject.email,
            "role": subject.role_tag,
            "groups": subject.group_memberships,
        })
    });
    Json(json!({
        "success": true,
        "user": user,
        "userSecurityLevel": context.current_level(),
        "userRole": context.subject().map(|subject| subject.role_tag),
        "tokenSource": context.token_source(),
        "degraded": context.is_degraded(),
    }))
}

// ============================================================================
// SECTION: Apps
// ============================================================================

/// `GET /api/apps`: active apps visible at the caller's level.
pub async fn list_apps(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<ClearanceContext>>,
) -> Json<Value> {
    let level = context.current_level();
    let active = state.catalog.active_apps();
    let total = active.len();
    let visible = filter_by_level(level, active);
    Json(json!({
        "success": true,
        "count": visible.len(),
        "totalApps": total,
        "userSecurityLevel": level,
        "data": visible,
    }))
}

/// `GET /api/apps/{id}`.
///
/// # Errors
///
/// Returns 404 for unknown apps and 403 when clearance is insufficient.
pub async fn get_app(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<ClearanceContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiRejection> {
    guarded_fetch(
        &state,
        &context,
        ResourceKind::App,
        &id,
        state.catalog.find_app(&id),
    )
}

// ============================================================================
// SECTION: Files
// ============================================================================

/// `GET /api/files`: active files passing the category/area filters and the
/// caller's level.
///
/// # Errors
///
/// Returns 400 when the filter parameters cannot be decoded (for example a
/// repeated `area`).
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<ClearanceContext>>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiRejection> {
    let Query(query) = query.map_err(|_| ApiRejection::BadRequest("Invalid file filters"))?;
    let level = context.current_level();
    let matching = state.catalog.active_files(&query);
    let total = matching.len();
    let visible = filter_by_level(level, matching);
    Ok(Json(json!({
        "success": true,
        "count": visible.len(),
        "totalFiles": total,
        "userSecurityLevel": level,
        "data": visible,
    })))
}

/// `GET /api/files/{id}`.
///
/// # Errors
///
/// Returns 404 for unknown files and 403 when clearance is insufficient.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<ClearanceContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiRejection> {
    guarded_fetch(
        &state,
        &context,
        ResourceKind::File,
        &id,
        state.catalog.find_file(&id),
    )
}

// ============================================================================
// SECTION: Classifications
// ============================================================================

/// `GET /api/classifications`: active classification groups, gated by the
/// configured minimum level.
///
/// # Errors
///
/// Returns 403 below the gate and 500 when the registry store fails.
pub async fn list_classifications(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<ClearanceContext>>,
) -> Result<Json<Value>, ApiRejection> {
    require_level(&context, state.registry_view_level)?;
    let registry = state.context.service.registry().clone();
    let groups = tokio::task::spawn_blocking(move || registry.active_groups())
        .await
        .ok()
        .and_then(Result::ok)
        .ok_or(ApiRejection::Internal("Server Error: Failed to fetch classifications"))?;
    Ok(Json(json!({
        "success": true,
        "count": groups.len(),
        "data": groups,
    })))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resource kinds served by fetch-by-id endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    /// Application tile.
    App,
    /// File resource.
    File,
}

impl ResourceKind {
    /// Audit label.
    const fn label(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::File => "file",
        }
    }

    /// 404 message.
    const fn not_found(self) -> &'static str {
        match self {
            Self::App => "App not found",
            Self::File => "File not found",
        }
    }

    /// 403 message.
    const fn forbidden(self) -> &'static str {
        match self {
            Self::App => "Insufficient security clearance to access this app",
            Self::File => "Insufficient security clearance to access this file",
        }
    }
}

/// Audits and authorizes a single-resource fetch.
fn guarded_fetch<R>(
    state: &AppState,
    context: &ClearanceContext,
    kind: ResourceKind,
    id: &str,
    found: Option<&R>,
) -> Result<Json<Value>, ApiRejection>
where
    R: ProtectedResource + Serialize,
{
    let level = context.current_level();
    let audit = &state.context.audit;
    let Some(resource) = found else {
        audit.record_access(&ResourceAccessEvent::not_found(
            kind.label(),
            id,
            context.subject(),
            level,
        ));
        return Err(ApiRejection::NotFound(kind.not_found()));
    };
    let check = check_single(level, resource);
    audit.record_access(&ResourceAccessEvent::checked(kind.label(), id, context.subject(), check));
    if !check.allowed {
        return Err(ApiRejection::Forbidden {
            message: kind.forbidden(),
            required: check.required,
            current: check.current,
        });
    }
    Ok(Json(json!({"success": true, "data": resource})))
}
