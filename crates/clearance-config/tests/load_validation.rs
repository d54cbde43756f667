//! Config load validation tests for clearance-config.
// crates/clearance-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// ============================================================================

mod common;

use std::io::Write;
use std::path::Path;

use clearance_config::ClearanceConfig;
use clearance_config::DirectoryBackend;
use common::TestResult;
use common::assert_invalid;
use tempfile::NamedTempFile;

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(ClearanceConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        ClearanceConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&vec![b'#'; 1_048_577]).map_err(|err| err.to_string())?;
    assert_invalid(ClearanceConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(ClearanceConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_reports_missing_file_as_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(ClearanceConfig::load(Some(&missing)), "config io error")
}

#[test]
fn load_reports_toml_syntax_errors() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[server\nbind = 1").map_err(|err| err.to_string())?;
    assert_invalid(ClearanceConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_accepts_empty_file_with_defaults() -> TestResult {
    let file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let config = ClearanceConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.directory.backend != DirectoryBackend::Memory {
        return Err("expected memory backend by default".to_string());
    }
    if config.identity.header != "x-user-id" || config.identity.field != "userId" {
        return Err("unexpected identity defaults".to_string());
    }
    let bind = config.server.bind_addr().map_err(|err| err.to_string())?;
    if bind.port() != 5000 || !bind.ip().is_loopback() {
        return Err(format!("unexpected default bind {bind}"));
    }
    if !config.audit.enabled || config.audit.log_resolutions {
        return Err("unexpected audit defaults".to_string());
    }
    Ok(())
}
