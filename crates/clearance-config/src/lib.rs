// crates/clearance-config/src/lib.rs
// ============================================================================
// Module: Clearance Config
// Description: Canonical configuration model for the clearance service.
// Purpose: Single source of truth for clearance.toml loading and validation.
// Dependencies: clearance-core, clearance-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! This crate owns the `clearance.toml` model. The server and CLI both load
//! configuration through [`ClearanceConfig::load`], so defaults and
//! validation rules live in one place.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::CatalogConfig;
pub use config::ClearanceConfig;
pub use config::ConfigError;
pub use config::DirectoryBackend;
pub use config::DirectoryConfig;
pub use config::IdentityConfig;
pub use config::ServerConfig;
pub use examples::config_toml_example;
