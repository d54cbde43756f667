// crates/clearance-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared assertions for config validation tests.
// ============================================================================

//! Shared helpers for clearance-config integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use clearance_config::ClearanceConfig;
use clearance_config::ConfigError;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Asserts that a config result is an error containing `needle`.
pub fn assert_invalid(result: Result<ClearanceConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Parses config text, mapping errors to strings.
pub fn parse(text: &str) -> Result<ClearanceConfig, String> {
    ClearanceConfig::from_toml_str(text).map_err(|err| err.to_string())
}
