// crates/clearance-config/src/config.rs
// ============================================================================
// Module: Clearance Configuration
// Description: Configuration loading and validation for the clearance service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: clearance-core, clearance-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to a loopback server backed by the
//! in-memory demo directory. Invalid values fail the load instead of being
//! clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use clearance_core::SecurityLevel;
use clearance_store_sqlite::SqliteStoreMode;
use clearance_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "clearance.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PORTAL_CLEARANCE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:5000";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Upper bound for `server.max_body_bytes`.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default subject token header.
const DEFAULT_TOKEN_HEADER: &str = "x-user-id";
/// Default subject token body/query field.
const DEFAULT_TOKEN_FIELD: &str = "userId";
/// Maximum length of identity header and field names.
pub(crate) const MAX_IDENTITY_NAME_LENGTH: usize = 64;
/// Default `SQLite` busy timeout.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the clearance service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearanceConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Subject token channel configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Directory store configuration.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Resource catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ClearanceConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `clearance.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.identity.validate()?;
        self.directory.validate()?;
        self.catalog.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum buffered request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Minimum clearance required to list classification groups.
    #[serde(default = "default_registry_view_level")]
    pub registry_view_level: SecurityLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            registry_view_level: default_registry_view_level(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes exceeds limit of {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Names of the channels carrying the subject token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// HTTP header consulted first.
    #[serde(default = "default_token_header")]
    pub header: String,
    /// Body and query field consulted after the header.
    #[serde(default = "default_token_field")]
    pub field: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { header: default_token_header(), field: default_token_field() }
    }
}

impl IdentityConfig {
    /// Validates identity channel names.
    fn validate(&self) -> Result<(), ConfigError> {
        let header = self.header.as_str();
        if header.is_empty() || header.len() > MAX_IDENTITY_NAME_LENGTH {
            return Err(ConfigError::Invalid("identity.header length out of range".to_string()));
        }
        if !header.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
        {
            return Err(ConfigError::Invalid(
                "identity.header must be lowercase letters, digits, or '-'".to_string(),
            ));
        }
        let field = self.field.as_str();
        if field.is_empty() || field.len() > MAX_IDENTITY_NAME_LENGTH {
            return Err(ConfigError::Invalid("identity.field length out of range".to_string()));
        }
        if !field.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
            return Err(ConfigError::Invalid(
                "identity.field must be ascii alphanumeric or '_'".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Directory store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    /// In-memory directory seeded with the demo data.
    #[default]
    Memory,
    /// `SQLite` database file.
    Sqlite,
    /// Directory of JSON array files.
    Json,
}

impl DirectoryBackend {
    /// Returns the config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Json => "json",
        }
    }
}

/// Directory store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub backend: DirectoryBackend,
    /// Database file (sqlite) or data directory (json).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl DirectoryConfig {
    /// Validates directory store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            DirectoryBackend::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory directory must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            DirectoryBackend::Sqlite | DirectoryBackend::Json => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid(format!("{} directory requires path", self.backend.as_str()))
                })?;
                validate_store_path("directory.path", path)
            }
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Resource catalog configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// JSON catalog file; the built-in demo catalog is used when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    /// Validates catalog configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_store_path("catalog.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
    /// Emit an event for every successful clearance resolution.
    #[serde(default)]
    pub log_resolutions: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: default_audit_enabled(), path: None, log_resolutions: false }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_store_path(field, Path::new(trimmed))
}

/// Validates a filesystem path field against length constraints.
fn validate_store_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default level required to list classification groups.
const fn default_registry_view_level() -> SecurityLevel {
    SecurityLevel::CEILING
}

/// Default subject token header.
fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

/// Default subject token field.
fn default_token_field() -> String {
    DEFAULT_TOKEN_FIELD.to_string()
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}
