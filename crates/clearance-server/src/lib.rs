// crates/clearance-server/src/lib.rs
// ============================================================================
// Module: Clearance Server
// Description: HTTP surface for the portal clearance core.
// Purpose: Expose level-filtered resources behind the clearance middleware.
// Dependencies: axum, clearance-core, clearance-config, tokio
// ============================================================================

//! ## Overview
//! Every request passes through [`clearance_middleware`], which attaches a
//! [`ClearanceContext`] before any handler runs. Handlers only read that
//! context; they never resolve subjects themselves.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod context;
pub mod directory;
pub mod handlers;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ClearanceAuditEvent;
pub use audit::ClearanceAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ResourceAccessEvent;
pub use audit::StderrAuditSink;
pub use catalog::AppResource;
pub use catalog::CatalogError;
pub use catalog::FileResource;
pub use catalog::ResourceCatalog;
pub use context::ClearanceContext;
pub use context::ClearanceService;
pub use context::ContextState;
pub use context::IdentityChannels;
pub use context::TokenSource;
pub use context::clearance_middleware;
pub use directory::DirectoryHandle;
pub use directory::SeedSummary;
pub use handlers::ApiRejection;
pub use handlers::require_level;
pub use server::AppState;
pub use server::ClearanceServer;
pub use server::ServerError;
pub use server::build_router;
