// crates/clearance-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Network exposure policy checks for the server launcher.
// Purpose: Keep the portal on loopback unless exposure is explicitly requested.
// Dependencies: clearance-config, thiserror
// ============================================================================

//! ## Overview
//! The subject token is asserted by the caller, not authenticated, so the
//! server binds to loopback by default. A non-loopback bind needs the
//! `--allow-non-loopback` flag or [`ALLOW_NON_LOOPBACK_ENV`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::net::SocketAddr;

use clearance_config::ClearanceConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable enabling non-loopback server binds.
pub const ALLOW_NON_LOOPBACK_ENV: &str = "PORTAL_CLEARANCE_ALLOW_NON_LOOPBACK";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bind outcome metadata for startup warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Address the server will bind.
    pub bind_addr: SocketAddr,
    /// True when the address is not loopback.
    pub network_exposed: bool,
    /// Whether audit logging is enabled.
    pub audit_enabled: bool,
}

/// Serve policy failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServePolicyError {
    /// Environment variable was set to an invalid value.
    #[error("{env} has invalid value '{value}'; use true or false", env = ALLOW_NON_LOOPBACK_ENV)]
    InvalidEnv {
        /// Raw environment value.
        value: String,
    },
    /// Bind string failed to parse.
    #[error("invalid bind address {bind}: {error}")]
    InvalidBind {
        /// Raw bind value.
        bind: String,
        /// Parse error message.
        error: String,
    },
    /// Non-loopback binding requires explicit opt-in.
    #[error(
        "refusing to bind {bind}: pass --allow-non-loopback or set {env}=true",
        env = ALLOW_NON_LOOPBACK_ENV
    )]
    NonLoopbackOptInRequired {
        /// Bind address.
        bind: String,
    },
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Resolves the non-loopback opt-in from the CLI flag and environment.
///
/// # Errors
///
/// Returns [`ServePolicyError::InvalidEnv`] when the environment value is
/// not a recognized boolean.
pub fn resolve_allow_non_loopback(flag: bool) -> Result<bool, ServePolicyError> {
    if flag {
        return Ok(true);
    }
    let Some(value) = env::var_os(ALLOW_NON_LOOPBACK_ENV) else {
        return Ok(false);
    };
    parse_allow_non_loopback_value(&value.to_string_lossy())
}

/// Checks the configured bind address against the exposure policy.
///
/// # Errors
///
/// Returns [`ServePolicyError`] when the address is invalid or non-loopback
/// without opt-in.
pub fn enforce_local_only(
    config: &ClearanceConfig,
    allow_non_loopback: bool,
) -> Result<BindOutcome, ServePolicyError> {
    let bind = config.server.bind.trim();
    let bind_addr: SocketAddr =
        bind.parse().map_err(|err: std::net::AddrParseError| ServePolicyError::InvalidBind {
            bind: bind.to_string(),
            error: err.to_string(),
        })?;
    let network_exposed = !bind_addr.ip().is_loopback();
    if network_exposed && !allow_non_loopback {
        return Err(ServePolicyError::NonLoopbackOptInRequired { bind: bind.to_string() });
    }
    Ok(BindOutcome { bind_addr, network_exposed, audit_enabled: config.audit.enabled })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a bool-ish string (true/false/1/0/yes/no/on/off).
fn parse_boolish(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an env value for allow-non-loopback.
fn parse_allow_non_loopback_value(value: &str) -> Result<bool, ServePolicyError> {
    parse_boolish(value).ok_or_else(|| ServePolicyError::InvalidEnv { value: value.to_string() })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
