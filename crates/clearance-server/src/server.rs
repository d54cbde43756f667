// crates/clearance-server/src/server.rs
// ============================================================================
// Module: Clearance Server
// Description: Router assembly and HTTP serving for the portal API.
// Purpose: Wire config, directory, catalog, and audit into an axum router.
// Dependencies: axum, clearance-config, tokio
// ============================================================================

//! ## Overview
//! [`ClearanceServer::from_config`] opens the configured directory, loads
//! the catalog, selects the audit sink, and builds the router. The clearance
//! middleware wraps every route.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use clearance_config::AuditConfig;
use clearance_config::ClearanceConfig;
use clearance_core::SecurityLevel;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::ClearanceAuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::catalog::ResourceCatalog;
use crate::context::ClearanceService;
use crate::context::ContextState;
use crate::context::IdentityChannels;
use crate::context::clearance_middleware;
use crate::directory::DirectoryHandle;
use crate::handlers;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server setup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration.
    #[error("server config error: {0}")]
    Config(String),
    /// Directory store failure.
    #[error("directory error: {0}")]
    Directory(String),
    /// Catalog load failure.
    #[error("catalog error: {0}")]
    Catalog(String),
    /// Audit sink failure.
    #[error("audit error: {0}")]
    Audit(String),
    /// Network I/O failure.
    #[error("server io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared handler state.
pub struct AppState {
    /// Clearance middleware state (service, channels, audit).
    pub context: Arc<ContextState>,
    /// Protected resources.
    pub catalog: Arc<ResourceCatalog>,
    /// Minimum level for `GET /api/classifications`.
    pub registry_view_level: SecurityLevel,
}

/// Builds the portal router over `state`.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let context = Arc::clone(&state.context);
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/debug/me", get(handlers::debug_me))
        .route("/api/apps", get(handlers::list_apps))
        .route("/api/apps/{id}", get(handlers::get_app))
        .route("/api/files", get(handlers::list_files))
        .route("/api/files/{id}", get(handlers::get_file))
        .route("/api/classifications", get(handlers::list_classifications))
        .fallback(handlers::route_not_found)
        .layer(from_fn_with_state(context, clearance_middleware))
        .with_state(state)
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured portal server.
pub struct ClearanceServer {
    /// Listen address.
    bind: SocketAddr,
    /// Fully wired router.
    router: Router,
    /// Backing directory store.
    directory: DirectoryHandle,
}

impl ClearanceServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the directory, catalog, or audit sink
    /// cannot be initialized.
    pub fn from_config(config: &ClearanceConfig) -> Result<Self, ServerError> {
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let directory = DirectoryHandle::open(&config.directory)?;
        let catalog = match &config.catalog.path {
            Some(path) => ResourceCatalog::load(path)
                .map_err(|err| ServerError::Catalog(err.to_string()))?,
            None => ResourceCatalog::demo(),
        };
        let context = ContextState {
            service: ClearanceService::new(directory.subjects(), directory.groups()),
            channels: IdentityChannels::new(&config.identity.header, &config.identity.field)?,
            max_body_bytes: config.server.max_body_bytes,
            audit: audit_sink(&config.audit)?,
            log_resolutions: config.audit.log_resolutions,
        };
        let state = AppState {
            context: Arc::new(context),
            catalog: Arc::new(catalog),
            registry_view_level: config.server.registry_view_level,
        };
        Ok(Self { bind, router: build_router(Arc::new(state)), directory })
    }

    /// Returns the listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the directory handle.
    #[must_use]
    pub const fn directory(&self) -> &DirectoryHandle {
        &self.directory
    }

    /// Returns a clone of the router.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener =
            TcpListener::bind(self.bind).await.map_err(|err| ServerError::Io(err.to_string()))?;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| ServerError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Selects the audit sink from configuration.
fn audit_sink(config: &AuditConfig) -> Result<Arc<dyn ClearanceAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| ServerError::Audit(err.to_string()))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
