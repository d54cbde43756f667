// crates/clearance-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for the portal-clearance binary.
// Purpose: Exercise config, seed, check, and serve guard paths end to end.
// Dependencies: clearance-cli binary, tempfile
// ============================================================================
//! ## Overview
//! Runs the built binary against temporary configs. Nothing here binds a
//! socket: `serve` is only driven down its refusal path.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn clearance_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_portal-clearance"))
}

fn run(args: &[&str]) -> Output {
    Command::new(clearance_bin())
        .args(args)
        .env_remove("PORTAL_CLEARANCE_CONFIG")
        .env_remove("PORTAL_CLEARANCE_ALLOW_NON_LOOPBACK")
        .output()
        .expect("run portal-clearance")
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("clearance.toml");
    fs::write(&path, body.trim()).expect("write config");
    path.to_string_lossy().into_owned()
}

fn sqlite_config(dir: &Path) -> String {
    let db = dir.join("directory.db");
    let catalog = dir.join("catalog.json");
    write_config(
        dir,
        &format!(
            "[directory]\ntype = \"sqlite\"\npath = {db:?}\n\n[catalog]\npath = {catalog:?}\n",
            db = db.to_string_lossy(),
            catalog = catalog.to_string_lossy(),
        ),
    )
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

#[test]
fn config_validate_accepts_minimal_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[server]\nbind = \"127.0.0.1:5050\"\n");

    let output = run(&["config", "validate", "--config", &config]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("config ok"), "stdout: {text}");
    assert!(text.contains("memory directory"), "stdout: {text}");
}

#[test]
fn config_validate_reports_invalid_sections() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[directory]\ntype = \"sqlite\"\n");

    let output = run(&["config", "validate", "--config", &config]);

    assert!(!output.status.success());
    let text = stderr(&output);
    assert!(text.contains("sqlite directory requires path"), "stderr: {text}");
}

#[test]
fn config_example_prints_loadable_toml() {
    let dir = TempDir::new().unwrap();
    let output = run(&["config", "example"]);
    assert!(output.status.success());

    let config = write_config(dir.path(), &stdout(&output));
    let validated = run(&["config", "validate", "--config", &config]);
    assert!(validated.status.success(), "stderr: {}", stderr(&validated));
}

// ============================================================================
// SECTION: Seed And Check
// ============================================================================

#[test]
fn seed_then_check_reports_top_clearance_for_admin() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());

    let seeded = run(&["seed", "--config", &config]);
    assert!(seeded.status.success(), "stderr: {}", stderr(&seeded));
    assert!(stdout(&seeded).contains("5 classification groups and 5 subjects"));

    let checked = run(&["check", "Admin.Security", "--config", &config]);
    assert!(checked.status.success(), "stderr: {}", stderr(&checked));
    let report: Value = serde_json::from_str(&stdout(&checked)).unwrap();
    assert_eq!(report["securityLevel"], 5);
    assert_eq!(report["tokenShape"], "username");
    assert_eq!(report["subject"]["username"], "admin.security");
}

#[test]
fn check_by_subject_id_uses_opaque_lookup() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());
    assert!(run(&["seed", "--config", &config]).status.success());

    let checked = run(&["check", "subj0manager000003", "--config", &config]);
    assert!(checked.status.success(), "stderr: {}", stderr(&checked));
    let report: Value = serde_json::from_str(&stdout(&checked)).unwrap();
    assert_eq!(report["tokenShape"], "opaque_id");
    assert_eq!(report["securityLevel"], 3);
}

#[test]
fn check_without_token_is_floor_level() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let checked = run(&["check", "--config", &config]);
    assert!(checked.status.success(), "stderr: {}", stderr(&checked));
    let report: Value = serde_json::from_str(&stdout(&checked)).unwrap();
    assert_eq!(report["securityLevel"], 1);
    assert!(report["subject"].is_null());
    assert!(report["tokenShape"].is_null());
}

#[test]
fn seed_rejects_memory_directory() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[directory]\ntype = \"memory\"\n");

    let output = run(&["seed", "--config", &config]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("memory directory is always seeded"));
}

#[test]
fn seed_catalog_requires_force_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(dir.path());
    let catalog = dir.path().join("catalog.json");

    let first = run(&["seed", "--catalog", "--config", &config]);
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert!(catalog.exists());

    let second = run(&["seed", "--catalog", "--config", &config]);
    assert!(!second.status.success());
    assert!(stderr(&second).contains("--force"));

    let forced = run(&["seed", "--catalog", "--force", "--config", &config]);
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));
}

// ============================================================================
// SECTION: Serve Guard
// ============================================================================

#[test]
fn serve_refuses_non_loopback_bind_without_opt_in() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[server]\nbind = \"0.0.0.0:5000\"\n");

    let output = run(&["serve", "--config", &config]);

    assert!(!output.status.success());
    let text = stderr(&output);
    assert!(text.contains("--allow-non-loopback"), "stderr: {text}");
}

#[test]
fn serve_rejects_malformed_opt_in_env() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[server]\nbind = \"0.0.0.0:5000\"\n");

    let output = Command::new(clearance_bin())
        .args(["serve", "--config", &config])
        .env_remove("PORTAL_CLEARANCE_CONFIG")
        .env("PORTAL_CLEARANCE_ALLOW_NON_LOOPBACK", "perhaps")
        .output()
        .expect("run portal-clearance");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid value 'perhaps'"));
}
