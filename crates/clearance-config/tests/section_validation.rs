//! Section validation tests for clearance-config.
// crates/clearance-config/tests/section_validation.rs
// ============================================================================
// Module: Config Section Validation Tests
// Description: Validate server, identity, directory, catalog, and audit rules.
// Purpose: Ensure invalid values are rejected instead of clamped.
// ============================================================================

mod common;

use clearance_config::ClearanceConfig;
use clearance_config::DirectoryBackend;
use clearance_core::SecurityLevel;
use clearance_store_sqlite::SqliteStoreMode;
use common::TestResult;
use common::assert_invalid;
use common::parse;

#[test]
fn bind_must_be_a_socket_address() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[server]\nbind = \"localhost\"\n"),
        "invalid bind address",
    )
}

#[test]
fn max_body_bytes_must_be_positive_and_bounded() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[server]\nmax_body_bytes = 0\n"),
        "max_body_bytes must be greater than zero",
    )?;
    assert_invalid(
        ClearanceConfig::from_toml_str("[server]\nmax_body_bytes = 999999999\n"),
        "max_body_bytes exceeds limit",
    )
}

#[test]
fn registry_view_level_is_range_checked() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[server]\nregistry_view_level = 6\n"),
        "outside 1..=5",
    )?;
    let config = parse("[server]\nregistry_view_level = 3\n")?;
    if config.server.registry_view_level != SecurityLevel::new(3).ok_or("level")? {
        return Err("registry_view_level not applied".to_string());
    }
    Ok(())
}

#[test]
fn identity_header_must_be_lowercase_token() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[identity]\nheader = \"X-User-Id\"\n"),
        "identity.header must be lowercase",
    )?;
    assert_invalid(
        ClearanceConfig::from_toml_str("[identity]\nheader = \"\"\n"),
        "identity.header length out of range",
    )
}

#[test]
fn identity_field_rejects_punctuation() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[identity]\nfield = \"user.id\"\n"),
        "identity.field must be ascii alphanumeric",
    )
}

#[test]
fn memory_directory_rejects_path() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[directory]\ntype = \"memory\"\npath = \"x.db\"\n"),
        "memory directory must not set path",
    )
}

#[test]
fn file_backed_directories_require_path() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[directory]\ntype = \"sqlite\"\n"),
        "sqlite directory requires path",
    )?;
    assert_invalid(
        ClearanceConfig::from_toml_str("[directory]\ntype = \"json\"\n"),
        "json directory requires path",
    )
}

#[test]
fn unknown_directory_type_fails_to_parse() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[directory]\ntype = \"ldap\"\n"),
        "config parse error",
    )
}

#[test]
fn sqlite_directory_options_parse() -> TestResult {
    let config = parse(
        "[directory]\ntype = \"sqlite\"\npath = \"data/dir.db\"\njournal_mode = \"delete\"\n",
    )?;
    if config.directory.backend != DirectoryBackend::Sqlite {
        return Err("expected sqlite backend".to_string());
    }
    if config.directory.journal_mode != SqliteStoreMode::Delete {
        return Err("journal_mode not applied".to_string());
    }
    if config.directory.busy_timeout_ms != 5_000 {
        return Err("unexpected busy timeout default".to_string());
    }
    Ok(())
}

#[test]
fn catalog_path_component_limit_applies() -> TestResult {
    let text = format!("[catalog]\npath = \"{}\"\n", "c".repeat(300));
    assert_invalid(ClearanceConfig::from_toml_str(&text), "catalog.path path component too long")
}

#[test]
fn audit_path_must_be_non_empty() -> TestResult {
    assert_invalid(
        ClearanceConfig::from_toml_str("[audit]\npath = \"   \"\n"),
        "audit.path must be non-empty",
    )
}
